use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};

use crate::{
    error::{Result, TricklerError},
    protocol,
};

/// Physical measurement state reported by the scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Weight has settled
    Stable = 0,
    /// Weight is still moving
    #[default]
    Unstable = 1,
    /// Load exceeds the weighing capacity
    Overload = 2,
    /// The scale reported an error code
    ErrorState = 3,
}

impl Status {
    /// Single-byte wire encoding
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "Stable"),
            Self::Unstable => write!(f, "Unstable"),
            Self::Overload => write!(f, "Overload"),
            Self::ErrorState => write!(f, "Error"),
        }
    }
}

/// Measurement unit selected on the scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Grains (`GN`)
    Grains = 0,
    /// Grams (`g`)
    Grams = 1,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grains => write!(f, "gr"),
            Self::Grams => write!(f, "g"),
        }
    }
}

/// Remote-controlled automatic trickle mode
///
/// Bytes other than 0 and 1 are carried through as [`AutoModeStatus::Other`]
/// so that a remote write is stored and echoed exactly as it was sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoModeStatus {
    /// Automatic trickling disabled
    #[default]
    Off,
    /// Automatic trickling enabled
    On,
    /// Unrecognized raw value written by a client
    Other(u8),
}

impl AutoModeStatus {
    /// Single-byte wire encoding
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
            Self::Other(value) => value,
        }
    }
}

impl From<u8> for AutoModeStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::On,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for AutoModeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::On => write!(f, "On"),
            Self::Other(value) => write!(f, "Unknown({value})"),
        }
    }
}

/// One successfully decoded measurement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Measurement state
    pub status: Status,
    /// Weight exactly as transmitted, trimmed of surrounding whitespace
    pub weight: String,
    /// Measurement unit
    pub unit: Unit,
}

impl Reading {
    /// Create a new reading
    #[must_use]
    pub fn new(status: Status, weight: impl Into<String>, unit: Unit) -> Self {
        Self {
            status,
            weight: weight.into(),
            unit,
        }
    }

    /// Numeric value of the weight text
    ///
    /// Padding spaces between the sign and the digits are ignored.
    #[must_use]
    pub fn weight_value(&self) -> Option<f64> {
        let compact: String = self.weight.chars().filter(|c| *c != ' ').collect();
        compact.parse().ok()
    }
}

/// Error status reported by the scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceError {
    /// Three-character vendor error code, e.g. `E07`
    pub code: String,
    /// Human-readable message from the static error table
    pub message: String,
}

impl DeviceError {
    /// Resolve a vendor error code against the static error table
    ///
    /// Unknown codes are kept and paired with a generic message.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            message: protocol::error_message(code)
                .unwrap_or(protocol::UNKNOWN_ERROR_MESSAGE)
                .to_string(),
        }
    }

    /// Whether the code was found in the static error table
    #[must_use]
    pub fn is_known(&self) -> bool {
        protocol::error_message(&self.code).is_some()
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A notification-worthy state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// A measurement was accepted; fires on every reading, changed or not
    Ready {
        /// Weight text of the accepted reading
        weight: String,
        /// Status of the accepted reading
        status: Status,
        /// Auto mode in force when the reading was accepted
        auto_mode: AutoModeStatus,
    },
    /// Auto mode was set, or an earlier `On` request is now live
    AutoModeChanged(AutoModeStatus),
}

/// Event kinds a remote session can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// [`ChangeEvent::Ready`]
    Ready,
    /// [`ChangeEvent::AutoModeChanged`]
    AutoModeChanged,
}

impl ChangeEvent {
    /// Kind of this event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ready { .. } => EventKind::Ready,
            Self::AutoModeChanged(_) => EventKind::AutoModeChanged,
        }
    }
}

/// Point-in-time copy of the scale session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSnapshot {
    /// Last reported measurement state
    pub status: Status,
    /// Last reported unit, unset until the first reading
    pub unit: Option<Unit>,
    /// Last reported weight text, unset until the first reading
    pub weight: Option<String>,
    /// Current auto mode
    pub auto_mode: AutoModeStatus,
    /// Whether an `On` request is still waiting for its first reading
    pub confirmation_pending: bool,
    /// Number of readings applied
    pub readings: u64,
    /// Number of device errors surfaced
    pub device_errors: u64,
    /// Most recent device error
    pub last_device_error: Option<DeviceError>,
    /// Time of the most recent reading
    pub last_reading_at: Option<SystemTime>,
}

/// Runtime configuration for the serial ingest loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TricklerConfig {
    /// Serial silence after which a warning is logged, in milliseconds
    pub idle_timeout_ms: u64,
}

impl Default for TricklerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 5_000,
        }
    }
}

impl TricklerConfig {
    /// Check the configuration for unusable values
    ///
    /// # Errors
    ///
    /// Returns [`TricklerError::InvalidParameters`] if the idle timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout_ms == 0 {
            return Err(TricklerError::InvalidParameters(
                "idle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_mode_from_u8() {
        assert_eq!(AutoModeStatus::from(0), AutoModeStatus::Off);
        assert_eq!(AutoModeStatus::from(1), AutoModeStatus::On);
        assert_eq!(AutoModeStatus::from(7), AutoModeStatus::Other(7));
        assert_eq!(AutoModeStatus::from(7).as_byte(), 7);
        assert_eq!(AutoModeStatus::default(), AutoModeStatus::Off);
    }

    #[test]
    fn test_status_bytes() {
        assert_eq!(Status::Stable.as_byte(), 0);
        assert_eq!(Status::Unstable.as_byte(), 1);
        assert_eq!(Status::Overload.as_byte(), 2);
        assert_eq!(Status::ErrorState.as_byte(), 3);
        assert_eq!(Status::default(), Status::Unstable);
    }

    #[test]
    fn test_weight_value() {
        let reading = Reading::new(Status::Stable, "+0012.345", Unit::Grains);
        assert!((reading.weight_value().unwrap() - 12.345).abs() < 1e-9);

        let padded = Reading::new(Status::Stable, "-   0.02", Unit::Grams);
        assert!((padded.weight_value().unwrap() + 0.02).abs() < 1e-9);

        let garbage = Reading::new(Status::Stable, "12.3.4", Unit::Grams);
        assert!(garbage.weight_value().is_none());
    }

    #[test]
    fn test_device_error_lookup() {
        let known = DeviceError::from_code("E07");
        assert_eq!(known.message, "Parameter setting error");
        assert!(known.is_known());

        let unknown = DeviceError::from_code("E99");
        assert_eq!(unknown.code, "E99");
        assert_eq!(unknown.message, protocol::UNKNOWN_ERROR_MESSAGE);
        assert!(!unknown.is_known());
    }

    #[test]
    fn test_config_validation() {
        assert!(TricklerConfig::default().validate().is_ok());

        let no_timeout = TricklerConfig { idle_timeout_ms: 0 };
        assert!(matches!(
            no_timeout.validate(),
            Err(TricklerError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_event_kind() {
        let ready = ChangeEvent::Ready {
            weight: "1.0".to_string(),
            status: Status::Stable,
            auto_mode: AutoModeStatus::Off,
        };
        assert_eq!(ready.kind(), EventKind::Ready);
        assert_eq!(
            ChangeEvent::AutoModeChanged(AutoModeStatus::On).kind(),
            EventKind::AutoModeChanged
        );
    }
}
