use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Trait for best-effort reachability checks
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &str) -> bool;
}

/// Runs the system `ping` once with a one-second deadline.
#[derive(Debug, Default, Clone, Copy)]
pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: &str) -> bool {
        Command::new("ping")
            .args(["-c", "1", "-W", "1", address])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Mock prober for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockProber {
    pub alive: std::sync::atomic::AtomicBool,
    pub probes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, _address: &str) -> bool {
        use std::sync::atomic::Ordering;

        self.probes.fetch_add(1, Ordering::SeqCst);
        self.alive.load(Ordering::SeqCst)
    }
}
