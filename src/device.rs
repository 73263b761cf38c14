use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    time::timeout,
};
use tracing::{debug, info, trace, warn};

use crate::{
    bridge::NotificationBridge,
    error::Result,
    protocol::{parse_line, ParseOutcome},
    state::{ScaleHandle, ScaleState},
    types::{ChangeEvent, DeviceError, ScaleSnapshot, TricklerConfig},
};

/// What became of one line from the scale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineDisposition {
    /// The line was a reading; these events were queued for subscribers
    Applied(Vec<ChangeEvent>),
    /// The scale is still warming up
    Incomplete,
    /// The scale reported an error
    DeviceError(DeviceError),
    /// The line was discarded
    Malformed(String),
}

/// Scale-to-remote bridge session
///
/// `Trickler` owns the single [`ScaleState`] of the process and the
/// [`NotificationBridge`] that remote sessions talk to. Serial lines go in
/// through [`Trickler::ingest_line`] or [`Trickler::run`]; remote requests go
/// in through [`Trickler::bridge`]. Both paths mutate the state under the same
/// lock and queue their events before releasing it.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use tokio::io::BufReader;
/// use tricklers::{SessionId, Trickler, TricklerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let trickler = Trickler::new(TricklerConfig::default())?;
///
///     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Bytes>();
///     trickler.bridge().on_subscribe(SessionId::new(), tx).await;
///     tokio::spawn(async move {
///         while let Some(value) = rx.recv().await {
///             println!("notify {:02X?}", &value[..]);
///         }
///     });
///
///     trickler.run(BufReader::new(tokio::io::stdin())).await?;
///     Ok(())
/// }
/// ```
pub struct Trickler {
    state: ScaleHandle,
    bridge: Arc<NotificationBridge>,
    config: TricklerConfig,
}

impl Trickler {
    /// Create a session with fresh state
    ///
    /// # Errors
    ///
    /// Returns [`TricklerError::InvalidParameters`](crate::TricklerError::InvalidParameters)
    /// if the configuration does not validate.
    pub fn new(config: TricklerConfig) -> Result<Self> {
        config.validate()?;

        let state = ScaleState::shared();
        let bridge = Arc::new(NotificationBridge::new(Arc::clone(&state)));

        Ok(Self {
            state,
            bridge,
            config,
        })
    }

    /// Remote-facing bridge, to be wired into the peripheral stack
    #[must_use]
    pub fn bridge(&self) -> Arc<NotificationBridge> {
        Arc::clone(&self.bridge)
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TricklerConfig {
        &self.config
    }

    /// Copy of the current scale state
    pub async fn snapshot(&self) -> ScaleSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Process one framed line from the scale
    ///
    /// Never fails: bad input is logged and discarded. Events of an applied
    /// reading are queued for subscribers before the state lock is released.
    pub async fn ingest_line(&self, line: &str) -> LineDisposition {
        let mut state = self.state.lock().await;
        match parse_line(line) {
            Ok(reading) => {
                let events = state.apply_reading(reading);
                self.bridge.dispatch(&events).await;
                LineDisposition::Applied(events)
            }
            Err(ParseOutcome::Incomplete) => {
                trace!("Scale not ready yet: {:?}", line);
                LineDisposition::Incomplete
            }
            Err(ParseOutcome::DeviceError(device_error)) => {
                state.apply_device_error(device_error.clone());
                LineDisposition::DeviceError(device_error)
            }
            Err(ParseOutcome::Malformed(reason)) => {
                warn!("Discarding line from scale {:?}: {}", line, reason);
                LineDisposition::Malformed(reason)
            }
        }
    }

    /// Read newline-terminated lines until end of input
    ///
    /// Invalid UTF-8 is replaced rather than rejected, and a trailing `\r` is
    /// stripped. Silence longer than the configured idle timeout is logged and
    /// waited out.
    ///
    /// # Errors
    ///
    /// Returns [`TricklerError::Io`](crate::TricklerError::Io) if reading fails.
    pub async fn run<R>(&self, mut reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("Listening for scale output");
        let idle = Duration::from_millis(self.config.idle_timeout_ms);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            // An interrupted read_until leaves its partial data in buf.
            let read = loop {
                match timeout(idle, reader.read_until(b'\n', &mut buf)).await {
                    Ok(read) => break read?,
                    Err(_) => warn!(
                        "No output from scale for {} ms",
                        self.config.idle_timeout_ms
                    ),
                }
            };

            if read == 0 && buf.is_empty() {
                info!("Scale output closed");
                return Ok(());
            }

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end_matches(['\n', '\r']);
            let disposition = self.ingest_line(line).await;
            debug!("Line {:?}: {:?}", line, disposition);
        }
    }
}
