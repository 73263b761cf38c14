#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # Tricklers
//!
//! A Rust library that bridges a precision powder scale on a serial line to a
//! wireless auto-trickle control channel.
//!
//! The scale streams fixed-width ASCII status lines such as `ST,+0012.345 GN`.
//! This crate decodes them, keeps the latest status, unit and weight together
//! with a remotely controlled auto-mode flag, and notifies remote subscribers
//! of every reading and every auto-mode change.
//!
//! ## Line Format
//!
//! | Columns   | Content                                   |
//! |-----------|-------------------------------------------|
//! | `[0,2)`   | status: `ST`, `QT` (counting), `US`, `OL`, `EC` |
//! | `[3,6)`   | error code, when the status is `EC`       |
//! | `[3,12)`  | weight text                               |
//! | `[12,15)` | unit: `GN` (grains) or `g` (grams)        |
//!
//! ## Auto-Mode Channel
//!
//! Remote clients read, write and subscribe to a single byte: `0` is off,
//! `1` is on. Every reading is notified with the current auto mode byte.
//! Switching auto mode on is echoed at once and confirmed again after the
//! next live reading from the scale.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bytes::Bytes;
//! use tokio::io::BufReader;
//! use tricklers::{Result, SessionId, Trickler, TricklerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let trickler = Trickler::new(TricklerConfig::default())?;
//!     let bridge = trickler.bridge();
//!
//!     // A peripheral stack forwards its subscribe/read/write callbacks here.
//!     let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<Bytes>();
//!     bridge.on_subscribe(SessionId::new(), tx).await;
//!     bridge.on_write_request(&[1], 0).await?;
//!
//!     // Feed scale output, already opened by the caller.
//!     trickler.run(BufReader::new(tokio::io::stdin())).await?;
//!     Ok(())
//! }
//! ```

/// Remote notification and request handling
pub mod bridge;
/// Scale session and serial ingest
pub mod device;
/// Error types and handling
pub mod error;
/// Scale line parser and wire encoding
pub mod protocol;
/// Scale state and change-event decisions
pub mod state;
/// Type definitions and data structures
pub mod types;

// Re-export the main types for convenient usage
pub use bridge::{NotificationBridge, SessionId, UpdateValueCallback};
pub use device::{LineDisposition, Trickler};
pub use error::{AttError, Result, TricklerError};
pub use protocol::{parse_line, ParseOutcome};
pub use state::{ScaleHandle, ScaleState};
pub use types::{
    AutoModeStatus, ChangeEvent, DeviceError, EventKind, Reading, ScaleSnapshot, Status,
    TricklerConfig, Unit,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// UUID of the auto-mode characteristic (read, write, notify)
pub const AUTO_MODE_CHAR_UUID: &str = "10000005-be5f-4b43-a49f-76f2d65c6e28";

/// User description published with the auto-mode characteristic
pub const AUTO_MODE_DESCRIPTION: &str = "Start/stop automatic trickle mode";
