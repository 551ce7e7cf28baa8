use std::sync::Arc;

use tokio::time::sleep;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::planner::{NavigationPlan, plan};
use super::state::{DeviceState, PowerPhase, StateObserver};
use crate::config::DeviceConfig;
use crate::device::{DeviceClient, Key, Prober, Reading, WakeTargetError, Waker, parse_wake_target};

/// One television: the device primitives plus the sequencing rules that tie power,
/// ambient light and input navigation together.
///
/// Every intent runs to completion on the caller's task. Waits are plain sleeps
/// and nothing here can be cancelled once started; concurrent intents interleave
/// freely at the transport.
pub struct Television {
    config: DeviceConfig,
    client: DeviceClient,
    waker: Arc<dyn Waker>,
    prober: Arc<dyn Prober>,
    state: Arc<DeviceState>,
    observer: Arc<dyn StateObserver>,
}

impl Television {
    pub fn new(
        config: DeviceConfig,
        client: DeviceClient,
        waker: Arc<dyn Waker>,
        prober: Arc<dyn Prober>,
        state: Arc<DeviceState>,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        Self {
            config,
            client,
            waker,
            prober,
            state,
            observer,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Read the power state and merge it into the last observed value.
    pub async fn refresh_power(&self) -> bool {
        let reading = self.client.get_power().await;
        let active = reading.merge(self.state.power());
        self.state.set_power(active);

        if let Reading::Known(on) = reading {
            self.set_phase(if on { PowerPhase::On } else { PowerPhase::Off });
        }

        self.observer.power_changed(active);
        active
    }

    pub async fn refresh_ambient(&self) -> bool {
        let reading = self.client.get_ambient().await;
        let active = reading.merge(self.state.ambient());
        self.state.set_ambient(active);
        self.observer.ambient_changed(active);
        active
    }

    /// Best-effort reachability check; the result is only logged.
    pub async fn probe(&self) -> bool {
        let alive = self.prober.probe(&self.config.address).await;
        if alive {
            debug!("{} is reachable", self.config.address);
        } else {
            info!("{} did not answer ping", self.config.address);
        }
        alive
    }

    pub async fn set_power(&self, on: bool) {
        if on {
            self.power_on().await;
        } else {
            self.power_off().await;
        }
    }

    /// Wake the set, then (with the power-on cascade) turn the ambient light on once
    /// it has had time to boot. The startup wait counts from the first wake packet.
    pub async fn power_on(&self) {
        info!("Powering on {}", self.config.name);
        self.set_phase(PowerPhase::TurningOn);

        if self.config.ambient_enabled() && self.config.power_on_cascade {
            tokio::join!(self.wake(), sleep(self.config.startup_wait));
            self.send_ambient(true).await;
        } else {
            self.wake().await;
        }
    }

    /// Standby, preceded (with the power-off cascade) by turning the ambient light off.
    pub async fn power_off(&self) {
        info!("Powering off {}", self.config.name);
        self.set_phase(PowerPhase::TurningOff);

        if self.config.ambient_enabled() && self.config.power_off_cascade {
            self.send_ambient(false).await;
            sleep(self.config.input_delay).await;
        }

        if let Err(e) = self.client.standby().await {
            warn!("Failed to send standby: {}", e);
        }
    }

    pub async fn set_ambient(&self, on: bool) {
        self.wait_for_startup().await;
        self.send_ambient(on).await;
    }

    /// Navigate to the input at `index` in the configured list.
    pub async fn select_input(&self, index: usize) {
        let Some(input) = self.config.inputs.get(index) else {
            warn!(
                "Ignoring input {}: only {} inputs configured",
                index,
                self.config.inputs.len()
            );
            return;
        };

        self.wait_for_startup().await;

        let plan = plan(
            input,
            self.config.has_no_channels,
            self.config.input_delay,
            self.config.channel_popup_wait,
        );
        info!("Selecting input '{}': {}", input.name, plan);
        self.execute(&plan).await;
    }

    /// Press one key; failures are logged and swallowed.
    pub async fn press(&self, key: Key) {
        match self.client.send_key(key).await {
            Ok(response) => debug!("{} -> {}", key, response),
            Err(e) => warn!("Failed to send {}: {}", key, e),
        }
    }

    /// Handle a flip of an input's switch. "On" powers the set up if needed while
    /// navigating to the input, then the switch is flipped back off.
    pub async fn activate_input_switch(&self, index: usize, on: bool) {
        if !on {
            return;
        }

        match self.config.inputs.get(index) {
            Some(input) if input.expose_as_switch => {}
            Some(input) => {
                warn!("Input '{}' is not exposed as a switch", input.name);
                return;
            }
            None => {
                warn!("Ignoring switch for unknown input {}", index);
                return;
            }
        }

        self.observer.input_switch_changed(index, true);

        let was_on = self.state.power();
        tokio::join!(
            async {
                if !was_on {
                    self.power_on().await;
                }
            },
            self.select_input(index),
        );

        self.observer.input_switch_changed(index, false);
    }

    /// Replay a plan. Every action's delay is honoured whether or not its key made it.
    pub async fn execute(&self, plan: &NavigationPlan) {
        for action in plan {
            self.press(action.key).await;
            sleep(action.post_delay).await;
        }
    }

    /// Sleep for the startup time if the set was last seen off.
    async fn wait_for_startup(&self) {
        if !self.state.power() {
            debug!(
                "{} looks off, waiting {:?} for it to start",
                self.config.name, self.config.startup_wait
            );
            sleep(self.config.startup_wait).await;
        }
    }

    async fn wake(&self) {
        let target = self.config.wake_address.as_deref().unwrap_or_default();
        match parse_wake_target(target) {
            Ok(mac) => {
                if let Err(e) = self.waker.wake(mac).await {
                    error!("Failed to send wake-on-LAN to {}: {}", mac, e);
                }
            }
            Err(e @ WakeTargetError::Missing) => warn!("Cannot wake {}: {}", self.config.name, e),
            Err(e) => error!("Cannot wake {}: {}", self.config.name, e),
        }
    }

    async fn send_ambient(&self, on: bool) {
        match self.client.set_ambient(on).await {
            Ok(response) => {
                debug!("Ambient light set to {}: {}", on, response);
                self.state.set_ambient(on);
                self.observer.ambient_changed(on);
            }
            Err(e) => warn!("Failed to set ambient light: {}", e),
        }
    }

    fn set_phase(&self, phase: PowerPhase) {
        self.state.set_phase(phase);
        self.observer.phase_changed(phase);
    }
}
