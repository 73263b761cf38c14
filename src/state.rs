use std::{sync::Arc, time::SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::types::{
    AutoModeStatus, ChangeEvent, DeviceError, Reading, ScaleSnapshot, Status, Unit,
};

/// Shared handle to the one scale state of a process
pub type ScaleHandle = Arc<Mutex<ScaleState>>;

/// Latest known scale status, unit, weight and auto mode
///
/// Every mutation returns the [`ChangeEvent`]s to notify. Callers queue them
/// before releasing the lock so that notification order follows mutation
/// order.
#[derive(Debug, Default)]
pub struct ScaleState {
    status: Status,
    unit: Option<Unit>,
    weight: Option<String>,
    auto_mode: AutoModeStatus,
    confirm_on_ready: bool,
    readings: u64,
    device_errors: u64,
    last_device_error: Option<DeviceError>,
    last_reading_at: Option<SystemTime>,
}

impl ScaleState {
    /// Create a state with nothing reported yet and auto mode off
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh state in a shareable handle
    #[must_use]
    pub fn shared() -> ScaleHandle {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Last reported measurement state
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Last reported unit
    #[must_use]
    pub const fn unit(&self) -> Option<Unit> {
        self.unit
    }

    /// Last reported weight text
    #[must_use]
    pub fn weight(&self) -> Option<&str> {
        self.weight.as_deref()
    }

    /// Current auto mode
    #[must_use]
    pub const fn auto_mode(&self) -> AutoModeStatus {
        self.auto_mode
    }

    /// Whether an `On` request still waits for its confirming reading
    #[must_use]
    pub const fn confirmation_pending(&self) -> bool {
        self.confirm_on_ready
    }

    /// Apply an accepted reading
    ///
    /// Always yields `Ready`, even when nothing changed. If auto mode was
    /// switched on since the previous reading, an `AutoModeChanged`
    /// confirmation follows it.
    pub fn apply_reading(&mut self, reading: Reading) -> Vec<ChangeEvent> {
        debug!(
            "Reading: {} {} {}",
            reading.status, reading.weight, reading.unit
        );

        self.status = reading.status;
        self.unit = Some(reading.unit);
        self.weight = Some(reading.weight.clone());
        self.readings += 1;
        self.last_reading_at = Some(SystemTime::now());

        let mut events = vec![ChangeEvent::Ready {
            weight: reading.weight,
            status: reading.status,
            auto_mode: self.auto_mode,
        }];

        if self.confirm_on_ready {
            self.confirm_on_ready = false;
            info!("Auto mode {} confirmed by live reading", self.auto_mode);
            events.push(ChangeEvent::AutoModeChanged(self.auto_mode));
        }

        events
    }

    /// Surface an error reported by the scale
    ///
    /// Measurement fields stay untouched and no event is produced. Auto mode
    /// is left as it is.
    pub fn apply_device_error(&mut self, device_error: DeviceError) {
        error!(
            "Scale error! code: {}, message: {}",
            device_error.code, device_error.message
        );
        self.device_errors += 1;
        self.last_device_error = Some(device_error);
    }

    /// Set auto mode as requested and echo it immediately
    ///
    /// `On` arms a one-shot confirmation for the next reading and `Off`
    /// cancels it. Other raw values are stored without touching it.
    pub fn request_auto_mode(&mut self, value: AutoModeStatus) -> Vec<ChangeEvent> {
        info!("Switching auto mode from {} to {}", self.auto_mode, value);
        self.auto_mode = value;

        match value {
            AutoModeStatus::On => self.confirm_on_ready = true,
            AutoModeStatus::Off => self.confirm_on_ready = false,
            AutoModeStatus::Other(_) => {}
        }

        vec![ChangeEvent::AutoModeChanged(value)]
    }

    /// Copy the current state
    #[must_use]
    pub fn snapshot(&self) -> ScaleSnapshot {
        ScaleSnapshot {
            status: self.status,
            unit: self.unit,
            weight: self.weight.clone(),
            auto_mode: self.auto_mode,
            confirmation_pending: self.confirm_on_ready,
            readings: self.readings,
            device_errors: self.device_errors,
            last_device_error: self.last_device_error.clone(),
            last_reading_at: self.last_reading_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(weight: &str) -> Reading {
        Reading::new(Status::Stable, weight, Unit::Grains)
    }

    fn ready(weight: &str, auto_mode: AutoModeStatus) -> ChangeEvent {
        ChangeEvent::Ready {
            weight: weight.to_string(),
            status: Status::Stable,
            auto_mode,
        }
    }

    #[test]
    fn test_defaults() {
        let state = ScaleState::new();
        assert_eq!(state.status(), Status::Unstable);
        assert_eq!(state.unit(), None);
        assert_eq!(state.weight(), None);
        assert_eq!(state.auto_mode(), AutoModeStatus::Off);
        assert!(!state.confirmation_pending());
    }

    #[test]
    fn test_reading_overwrites_fields() {
        let mut state = ScaleState::new();
        let events = state.apply_reading(Reading::new(Status::Overload, "0.5", Unit::Grams));

        assert_eq!(
            events,
            vec![ChangeEvent::Ready {
                weight: "0.5".to_string(),
                status: Status::Overload,
                auto_mode: AutoModeStatus::Off,
            }]
        );
        assert_eq!(state.status(), Status::Overload);
        assert_eq!(state.unit(), Some(Unit::Grams));
        assert_eq!(state.weight(), Some("0.5"));
    }

    #[test]
    fn test_same_reading_twice_notifies_twice() {
        let mut state = ScaleState::new();

        let first = state.apply_reading(reading("12.345"));
        let snapshot = state.snapshot();
        let second = state.apply_reading(reading("12.345"));

        assert_eq!(first, vec![ready("12.345", AutoModeStatus::Off)]);
        assert_eq!(second, vec![ready("12.345", AutoModeStatus::Off)]);
        assert_eq!(state.weight(), snapshot.weight.as_deref());
        assert_eq!(state.unit(), snapshot.unit);
        assert_eq!(state.status(), snapshot.status);
        assert_eq!(state.snapshot().readings, 2);
    }

    #[test]
    fn test_auto_mode_on_confirms_once() {
        let mut state = ScaleState::new();

        let echo = state.request_auto_mode(AutoModeStatus::On);
        assert_eq!(echo, vec![ChangeEvent::AutoModeChanged(AutoModeStatus::On)]);
        assert_eq!(state.auto_mode(), AutoModeStatus::On);
        assert!(state.confirmation_pending());

        let confirmed = state.apply_reading(reading("1.0"));
        assert_eq!(
            confirmed,
            vec![
                ready("1.0", AutoModeStatus::On),
                ChangeEvent::AutoModeChanged(AutoModeStatus::On)
            ]
        );
        assert!(!state.confirmation_pending());

        let later = state.apply_reading(reading("1.1"));
        assert_eq!(later, vec![ready("1.1", AutoModeStatus::On)]);
    }

    #[test]
    fn test_auto_mode_off_has_no_confirmation() {
        let mut state = ScaleState::new();

        let echo = state.request_auto_mode(AutoModeStatus::Off);
        assert_eq!(echo, vec![ChangeEvent::AutoModeChanged(AutoModeStatus::Off)]);

        let events = state.apply_reading(reading("2.0"));
        assert_eq!(events, vec![ready("2.0", AutoModeStatus::Off)]);
    }

    #[test]
    fn test_off_cancels_pending_confirmation() {
        let mut state = ScaleState::new();
        state.request_auto_mode(AutoModeStatus::On);
        state.request_auto_mode(AutoModeStatus::Off);

        assert!(!state.confirmation_pending());
        assert_eq!(
            state.apply_reading(reading("3.0")),
            vec![ready("3.0", AutoModeStatus::Off)]
        );
    }

    #[test]
    fn test_out_of_range_value_is_stored() {
        let mut state = ScaleState::new();
        let events = state.request_auto_mode(AutoModeStatus::Other(5));

        assert_eq!(events, vec![ChangeEvent::AutoModeChanged(AutoModeStatus::Other(5))]);
        assert_eq!(state.auto_mode().as_byte(), 5);
        assert!(!state.confirmation_pending());
    }

    #[test]
    fn test_device_error_leaves_measurement_alone() {
        let mut state = ScaleState::new();
        state.apply_reading(reading("4.2"));
        state.request_auto_mode(AutoModeStatus::On);

        state.apply_device_error(DeviceError::from_code("E11"));

        assert_eq!(state.status(), Status::Stable);
        assert_eq!(state.weight(), Some("4.2"));
        assert_eq!(state.unit(), Some(Unit::Grains));
        assert_eq!(state.auto_mode(), AutoModeStatus::On);
        assert!(state.confirmation_pending());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.device_errors, 1);
        assert_eq!(
            snapshot.last_device_error.map(|e| e.code),
            Some("E11".to_string())
        );
    }
}
