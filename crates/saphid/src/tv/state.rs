use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use serde::Serialize;
use tokio::sync::watch;

/// Advisory power phase. Recorded for observers, never used to gate intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PowerPhase {
    #[default]
    Off = 0,
    TurningOn = 1,
    On = 2,
    TurningOff = 3,
}

impl PowerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PowerPhase::TurningOn,
            2 => PowerPhase::On,
            3 => PowerPhase::TurningOff,
            _ => PowerPhase::Off,
        }
    }
}

/// Last-known observed device state.
///
/// Each field is an independent atomic: the poller and user intents write them
/// concurrently and unordered, and readers see whichever write landed last.
#[derive(Debug, Default)]
pub struct DeviceState {
    power: AtomicBool,
    ambient: AtomicBool,
    phase: AtomicU8,
}

impl DeviceState {
    pub fn power(&self) -> bool {
        self.power.load(Ordering::SeqCst)
    }

    pub fn set_power(&self, active: bool) {
        self.power.store(active, Ordering::SeqCst);
    }

    pub fn ambient(&self) -> bool {
        self.ambient.load(Ordering::SeqCst)
    }

    pub fn set_ambient(&self, active: bool) {
        self.ambient.store(active, Ordering::SeqCst);
    }

    pub fn phase(&self) -> PowerPhase {
        PowerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn set_phase(&self, phase: PowerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub power_active: bool,
    pub ambient_active: bool,
    pub phase: PowerPhase,
    /// Input switches that are currently on, by input index.
    pub switching_inputs: BTreeSet<usize>,
}

/// Receives every merged value, whether or not it changed.
pub trait StateObserver: Send + Sync {
    fn power_changed(&self, active: bool);

    fn ambient_changed(&self, active: bool);

    fn phase_changed(&self, _phase: PowerPhase) {}

    /// An input switch turned on, or was flipped back once its input was selected.
    fn input_switch_changed(&self, _index: usize, _on: bool) {}
}

/// Publishes into a `watch` channel read by the HTTP API.
pub struct WatchPublisher {
    tx: watch::Sender<Snapshot>,
}

impl WatchPublisher {
    pub fn channel() -> (Self, watch::Receiver<Snapshot>) {
        let (tx, rx) = watch::channel(Snapshot::default());
        (Self { tx }, rx)
    }
}

impl StateObserver for WatchPublisher {
    fn power_changed(&self, active: bool) {
        self.tx.send_modify(|s| s.power_active = active);
    }

    fn ambient_changed(&self, active: bool) {
        self.tx.send_modify(|s| s.ambient_active = active);
    }

    fn phase_changed(&self, phase: PowerPhase) {
        self.tx.send_modify(|s| s.phase = phase);
    }

    fn input_switch_changed(&self, index: usize, on: bool) {
        self.tx.send_modify(|s| {
            if on {
                s.switching_inputs.insert(index);
            } else {
                s.switching_inputs.remove(&index);
            }
        });
    }
}

/// Event seen by [`RecordingObserver`].
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Power(bool),
    Ambient(bool),
    Phase(PowerPhase),
    InputSwitch(usize, bool),
}

/// Observer that keeps every notification, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: std::sync::Mutex<Vec<Observed>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    pub fn power_events(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Power(active) => Some(active),
                _ => None,
            })
            .collect()
    }

    pub fn ambient_events(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Ambient(active) => Some(active),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl StateObserver for RecordingObserver {
    fn power_changed(&self, active: bool) {
        self.events.lock().unwrap().push(Observed::Power(active));
    }

    fn ambient_changed(&self, active: bool) {
        self.events.lock().unwrap().push(Observed::Ambient(active));
    }

    fn phase_changed(&self, phase: PowerPhase) {
        self.events.lock().unwrap().push(Observed::Phase(phase));
    }

    fn input_switch_changed(&self, index: usize, on: bool) {
        self.events
            .lock()
            .unwrap()
            .push(Observed::InputSwitch(index, on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_independent() {
        let state = DeviceState::default();
        state.set_power(true);
        assert!(state.power());
        assert!(!state.ambient());

        state.set_ambient(true);
        state.set_power(false);
        assert!(state.ambient());
        assert!(!state.power());
    }

    #[test]
    fn test_phase_round_trips_through_atomic() {
        let state = DeviceState::default();
        assert_eq!(state.phase(), PowerPhase::Off);
        for phase in [
            PowerPhase::TurningOn,
            PowerPhase::On,
            PowerPhase::TurningOff,
            PowerPhase::Off,
        ] {
            state.set_phase(phase);
            assert_eq!(state.phase(), phase);
        }
    }

    #[test]
    fn test_watch_publisher_notifies_on_unchanged_values() {
        let (publisher, mut rx) = WatchPublisher::channel();
        rx.borrow_and_update();

        publisher.power_changed(false);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        publisher.ambient_changed(true);
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            *rx.borrow_and_update(),
            Snapshot {
                power_active: false,
                ambient_active: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_watch_publisher_tracks_input_switches() {
        let (publisher, rx) = WatchPublisher::channel();

        publisher.input_switch_changed(2, true);
        publisher.input_switch_changed(0, true);
        assert_eq!(rx.borrow().switching_inputs, BTreeSet::from([0, 2]));

        publisher.input_switch_changed(2, false);
        assert_eq!(rx.borrow().switching_inputs, BTreeSet::from([0]));

        publisher.input_switch_changed(0, false);
        assert!(rx.borrow().switching_inputs.is_empty());
    }
}
