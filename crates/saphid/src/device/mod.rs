//! Capability wrappers around the television's control surface: the JSON-over-HTTP
//! dialect, wake-on-LAN and a reachability probe.

mod client;
mod error;
mod key;
mod probe;
mod wol;

pub use client::DeviceClient;
pub use client::Endpoint;
pub use client::HttpTransport;
pub use client::Reading;
pub use client::Transport;
pub use client::ambient_body;
pub use client::power_off_body;
pub use client::power_on_body;
pub use error::DeviceError;
pub use key::Key;
pub use key::RemoteKey;
pub use key::VolumeDirection;
pub use probe::PingProber;
pub use probe::Prober;
pub use wol::MacAddress;
pub use wol::UdpWaker;
pub use wol::WakeTargetError;
pub use wol::Waker;
pub use wol::parse_wake_target;

#[cfg(test)]
pub use client::MockTransport;
#[cfg(test)]
pub use probe::MockProber;
#[cfg(test)]
pub use wol::MockWaker;
