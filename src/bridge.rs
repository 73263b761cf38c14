use async_trait::async_trait;
use bytes::Bytes;
use futures::{channel::mpsc as queue, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AttError,
    protocol::{decode_auto_mode, encode_auto_mode, encode_event},
    state::ScaleHandle,
    types::{ChangeEvent, EventKind},
};

/// Transport callback that pushes a notification value to a remote client
///
/// Callbacks run on a delivery task of their own, outside every lock of the
/// bridge, so they may call back into it.
#[async_trait]
pub trait UpdateValueCallback: Send + Sync {
    /// Deliver one encoded value
    async fn update_value(&self, data: Bytes);
}

#[async_trait]
impl UpdateValueCallback for mpsc::UnboundedSender<Bytes> {
    async fn update_value(&self, data: Bytes) {
        if self.send(data).is_err() {
            debug!("Notification receiver dropped, value discarded");
        }
    }
}

/// Identity of one remote session, as assigned by the peripheral stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Use an existing identifier
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying identifier
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered queue of encoded values waiting for one session's callback
type Outbox = queue::UnboundedSender<Bytes>;

/// Start the task that feeds a session's queue into its callback
///
/// The task ends once every sender of the queue is gone, after delivering
/// what was already queued.
fn spawn_delivery<C>(session: SessionId, callback: C) -> Outbox
where
    C: UpdateValueCallback + 'static,
{
    let (outbox, mut pending) = queue::unbounded::<Bytes>();

    tokio::spawn(async move {
        while let Some(data) = pending.next().await {
            callback.update_value(data).await;
        }
        debug!("Delivery for session {} finished", session);
    });

    outbox
}

/// Remote-facing side of the auto-mode channel
///
/// Subscriptions are kept per session and per [`EventKind`]; a session has
/// at most one callback per kind. Writes are forwarded into the shared
/// [`ScaleState`](crate::state::ScaleState) and the resulting events are
/// queued before the state lock is released, so every session sees them in
/// mutation order.
pub struct NotificationBridge {
    state: ScaleHandle,
    subscriptions: RwLock<HashMap<SessionId, HashMap<EventKind, Outbox>>>,
}

impl NotificationBridge {
    /// Create a bridge over the given scale state
    #[must_use]
    pub fn new(state: ScaleHandle) -> Self {
        Self {
            state,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session for `Ready` and `AutoModeChanged` notifications
    ///
    /// Subscribing again from the same session replaces its callback. Values
    /// already queued for the old callback are still delivered to it.
    pub async fn on_subscribe<C>(&self, session: SessionId, callback: C)
    where
        C: UpdateValueCallback + 'static,
    {
        let outbox = spawn_delivery(session, callback);
        let kinds = HashMap::from([
            (EventKind::Ready, outbox.clone()),
            (EventKind::AutoModeChanged, outbox),
        ]);

        let replaced = self
            .subscriptions
            .write()
            .await
            .insert(session, kinds)
            .is_some();

        if replaced {
            info!("Session {} re-subscribed, previous callback replaced", session);
        } else {
            info!("Session {} subscribed", session);
        }
    }

    /// Drop every registration of a session
    ///
    /// Unknown sessions are ignored.
    pub async fn on_unsubscribe(&self, session: SessionId) {
        if self.subscriptions.write().await.remove(&session).is_some() {
            info!("Session {} unsubscribed", session);
        } else {
            debug!("Unsubscribe for session {} without a subscription", session);
        }
    }

    /// Read the current auto mode as one byte
    ///
    /// # Errors
    ///
    /// Returns [`AttError::AttributeNotLong`] for a non-zero offset.
    pub async fn on_read_request(&self, offset: usize) -> Result<Bytes, AttError> {
        if offset != 0 {
            return Err(AttError::AttributeNotLong);
        }

        let auto_mode = self.state.lock().await.auto_mode();
        Ok(encode_auto_mode(auto_mode))
    }

    /// Handle a remote write of the auto mode
    ///
    /// The acknowledgment does not wait for the scale; the new mode is set
    /// optimistically and echoed to subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`AttError::AttributeNotLong`] for a non-zero offset and
    /// [`AttError::InvalidAttributeLength`] unless exactly one byte is written.
    pub async fn on_write_request(&self, data: &[u8], offset: usize) -> Result<(), AttError> {
        if offset != 0 {
            return Err(AttError::AttributeNotLong);
        }
        let requested = decode_auto_mode(data)?;

        let mut state = self.state.lock().await;
        let events = state.request_auto_mode(requested);
        self.dispatch(&events).await;
        drop(state);

        Ok(())
    }

    /// Queue events, in order, for every session registered for their kind
    ///
    /// Never waits on a callback. Events nobody listens to are dropped.
    pub async fn dispatch(&self, events: &[ChangeEvent]) {
        let subscriptions = self.subscriptions.read().await;

        for event in events {
            let outboxes: Vec<(&SessionId, &Outbox)> = subscriptions
                .iter()
                .filter_map(|(session, kinds)| kinds.get(&event.kind()).map(|o| (session, o)))
                .collect();

            if outboxes.is_empty() {
                debug!("No subscriber for {:?}, dropping", event);
                continue;
            }

            let data = encode_event(event);
            debug!(
                "Notifying {} session(s) of {:?}: {:02X?}",
                outboxes.len(),
                event,
                &data[..]
            );
            for (session, outbox) in outboxes {
                if outbox.unbounded_send(data.clone()).is_err() {
                    debug!("Delivery for session {} stopped, value discarded", session);
                }
            }
        }
    }

    /// Number of sessions with an active subscription
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}
