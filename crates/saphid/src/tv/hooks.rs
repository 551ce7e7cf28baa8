use async_trait::async_trait;

use super::planner::InputDescriptor;
use super::sequencer::Television;
use crate::device::{Key, RemoteKey, VolumeDirection};

/// Get/set callbacks an accessory front end drives.
///
/// Setters complete when the whole intent has run, including any startup waits and
/// navigation delays; callers wanting callback-first behaviour should spawn them.
#[async_trait]
pub trait AccessoryHooks: Send + Sync {
    fn name(&self) -> &str;

    fn inputs(&self) -> &[InputDescriptor];

    /// Refresh the power state from the device, then return it.
    async fn get_power(&self) -> bool;

    async fn set_power(&self, on: bool);

    async fn get_ambient(&self) -> bool;

    async fn set_ambient(&self, on: bool);

    async fn set_active_identifier(&self, index: usize);

    async fn send_remote_key(&self, key: RemoteKey);

    async fn adjust_volume(&self, direction: VolumeDirection);

    async fn set_input_switch(&self, index: usize, on: bool);
}

#[async_trait]
impl AccessoryHooks for Television {
    fn name(&self) -> &str {
        &self.config().name
    }

    fn inputs(&self) -> &[InputDescriptor] {
        &self.config().inputs
    }

    async fn get_power(&self) -> bool {
        self.refresh_power().await
    }

    async fn set_power(&self, on: bool) {
        Television::set_power(self, on).await
    }

    async fn get_ambient(&self) -> bool {
        if self.config().ambient_enabled() {
            self.refresh_ambient().await
        } else {
            self.state().ambient()
        }
    }

    async fn set_ambient(&self, on: bool) {
        Television::set_ambient(self, on).await
    }

    async fn set_active_identifier(&self, index: usize) {
        self.select_input(index).await
    }

    async fn send_remote_key(&self, key: RemoteKey) {
        self.press(Key::from(key)).await
    }

    async fn adjust_volume(&self, direction: VolumeDirection) {
        self.press(Key::from(direction)).await
    }

    async fn set_input_switch(&self, index: usize, on: bool) {
        self.activate_input_switch(index, on).await
    }
}
