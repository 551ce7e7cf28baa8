use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::sequencer::Television;

/// Periodically re-reads the device and republishes what it finds.
pub struct Poller {
    tv: Arc<Television>,
}

/// Handle to a running poller. Dropping it leaves the task running.
pub struct PollerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Poller {
    pub fn new(tv: Arc<Television>) -> Self {
        Self { tv }
    }

    /// One reconciliation tick. Reachability never gates the reads.
    pub async fn tick(&self) {
        let tv = &self.tv;
        let ambient = async {
            if tv.config().ambient_enabled() {
                Some(tv.refresh_ambient().await)
            } else {
                None
            }
        };

        let (_, power, ambient) = tokio::join!(tv.probe(), tv.refresh_power(), ambient);
        debug!("Tick: power={} ambient={:?}", power, ambient);
    }

    /// Run ticks every polling interval, starting one interval from now.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let period = self.tv.config().polling_interval;

        let task = tokio::spawn(async move {
            info!("Polling every {:?}", period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => self.tick().await,
                }
            }

            info!("Poller stopped");
        });

        PollerHandle { shutdown_tx, task }
    }
}

impl PollerHandle {
    pub async fn stop(self) {
        // The task may already have exited
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!("Poller task failed: {}", e);
        }
    }
}
