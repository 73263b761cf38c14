use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Range;
use thiserror::Error;

use crate::{
    error::AttError,
    types::{AutoModeStatus, ChangeEvent, DeviceError, Reading, Status, Unit},
};

/// Columns holding the two-letter status code
pub const STATUS_COLUMNS: Range<usize> = 0..2;

/// Columns holding the three-character error code when the status is `EC`
pub const ERROR_CODE_COLUMNS: Range<usize> = 3..6;

/// Columns holding the weight text
pub const WEIGHT_COLUMNS: Range<usize> = 3..12;

/// Columns holding the unit code
pub const UNIT_COLUMNS: Range<usize> = 12..15;

/// Width of a complete measurement line, excluding the terminator
pub const LINE_WIDTH: usize = UNIT_COLUMNS.end;

/// Size of every value exchanged on the auto-mode channel
pub const AUTO_MODE_VALUE_SIZE: usize = 1;

/// Message used for error codes missing from [`ERROR_CODES`]
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Vendor status codes. `QT` is the counting mode and reads as stable.
const STATUS_CODES: [(&str, Status); 5] = [
    ("ST", Status::Stable),
    ("QT", Status::Stable),
    ("US", Status::Unstable),
    ("OL", Status::Overload),
    ("EC", Status::ErrorState),
];

const UNIT_CODES: [(&str, Unit); 2] = [("GN", Unit::Grains), ("g", Unit::Grams)];

/// Error codes the scale reports alongside the `EC` status
pub const ERROR_CODES: [(&str, &str); 11] = [
    ("E00", "Communications error"),
    ("E01", "Undefined command error"),
    ("E02", "Not ready"),
    ("E03", "Timeout error"),
    ("E04", "Excess characters error"),
    ("E06", "Format error"),
    ("E07", "Parameter setting error"),
    ("E11", "Stability error"),
    ("E17", "Internal mass error"),
    (
        "E20",
        "Calibration weight error: The calibration weight is too heavy",
    ),
    (
        "E21",
        "Calibration weight error: The calibration weight is too light",
    ),
];

/// Why a line did not produce a [`Reading`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Status or unit not resolvable yet; the scale is still warming up
    #[error("Scale output not ready")]
    Incomplete,

    /// The scale reported an error status
    #[error("Device error {0}")]
    DeviceError(DeviceError),

    /// The line does not have the expected shape
    #[error("Malformed line: {0}")]
    Malformed(String),
}

/// Look up the message for a vendor error code
#[must_use]
pub fn error_message(code: &str) -> Option<&'static str> {
    ERROR_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// Resolve a trimmed status code
#[must_use]
pub fn status_from_code(code: &str) -> Option<Status> {
    STATUS_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, status)| *status)
}

/// Resolve a trimmed unit code
#[must_use]
pub fn unit_from_code(code: &str) -> Option<Unit> {
    UNIT_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, unit)| *unit)
}

/// Slice a line by character columns, clamped to the line length
fn column(line: &str, columns: Range<usize>) -> &str {
    let byte_at = |col: usize| {
        line.char_indices()
            .nth(col)
            .map_or(line.len(), |(index, _)| index)
    };
    let start = byte_at(columns.start);
    let end = byte_at(columns.end);
    &line[start..end.max(start)]
}

/// Parse one fixed-width line from the scale
///
/// Line layout, 0-indexed and half-open:
/// - `[0,2)`: status code (`ST`, `QT`, `US`, `OL`, `EC`)
/// - `[3,6)`: error code, only when the status is `EC`
/// - `[3,12)`: weight text
/// - `[12,15)`: unit code (`GN` or `g`)
///
/// # Errors
///
/// Returns [`ParseOutcome::Incomplete`] while the status or unit columns do not
/// decode, [`ParseOutcome::DeviceError`] for any `EC` line, and
/// [`ParseOutcome::Malformed`] when a measurement line stops before its unit
/// column. The weight text is passed through as-is.
pub fn parse_line(line: &str) -> Result<Reading, ParseOutcome> {
    let raw_status = column(line, STATUS_COLUMNS).trim();
    let status = status_from_code(raw_status).ok_or(ParseOutcome::Incomplete)?;

    if status == Status::ErrorState {
        let code = column(line, ERROR_CODE_COLUMNS);
        return Err(ParseOutcome::DeviceError(DeviceError::from_code(code)));
    }

    if line.chars().count() <= UNIT_COLUMNS.start {
        return Err(ParseOutcome::Malformed(format!(
            "line ends before the unit column at {}",
            UNIT_COLUMNS.start
        )));
    }

    let weight = column(line, WEIGHT_COLUMNS).trim();
    let raw_unit = column(line, UNIT_COLUMNS).trim();
    let unit = unit_from_code(raw_unit).ok_or(ParseOutcome::Incomplete)?;

    Ok(Reading::new(status, weight, unit))
}

/// Encode an auto-mode value for the wire
#[must_use]
pub fn encode_auto_mode(value: AutoModeStatus) -> Bytes {
    let mut buf = BytesMut::with_capacity(AUTO_MODE_VALUE_SIZE);
    buf.put_u8(value.as_byte());
    buf.freeze()
}

/// Encode a change event as a single-byte notification
///
/// Both kinds carry the auto mode byte, so a `Ready` never reads as a mode
/// change to the client.
#[must_use]
pub fn encode_event(event: &ChangeEvent) -> Bytes {
    match event {
        ChangeEvent::Ready { auto_mode, .. } | ChangeEvent::AutoModeChanged(auto_mode) => {
            encode_auto_mode(*auto_mode)
        }
    }
}

/// Decode a remote write on the auto-mode channel
///
/// Any byte value is accepted and carried through unvalidated.
///
/// # Errors
///
/// Returns [`AttError::InvalidAttributeLength`] unless exactly one byte is given.
pub fn decode_auto_mode(data: &[u8]) -> Result<AutoModeStatus, AttError> {
    match data {
        [value] => Ok(AutoModeStatus::from(*value)),
        _ => Err(AttError::InvalidAttributeLength),
    }
}
