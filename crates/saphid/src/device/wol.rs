//! Wake-on-LAN: target parsing and the magic-packet burst.

use std::fmt;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Six bytes of `0xFF` followed by sixteen repetitions of the address.
    pub fn magic_packet(&self) -> [u8; MAGIC_PACKET_LEN] {
        let mut packet = [0xFF; MAGIC_PACKET_LEN];
        for chunk in packet[6..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = WakeTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || WakeTargetError::Malformed(s.to_string());

        let hex: String = if s.contains([':', '-']) {
            let groups: Vec<&str> = s.split([':', '-']).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
                return Err(malformed());
            }
            groups.concat()
        } else {
            s.to_string()
        };

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| malformed())?;
        }
        Ok(MacAddress(octets))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WakeTargetError {
    #[error("no wake-on-LAN address configured")]
    Missing,

    #[error("'{0}' is not a wake-on-LAN target")]
    Malformed(String),
}

/// Parse `WOL://<mac>`, `WOL:<mac>` (scheme case-insensitive, slashes optional) or a
/// bare MAC address.
pub fn parse_wake_target(target: &str) -> Result<MacAddress, WakeTargetError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(WakeTargetError::Missing);
    }

    let has_scheme = target
        .get(..3)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("wol"));
    if !has_scheme {
        return target.parse();
    }

    let mut rest = &target[3..];
    rest = rest.strip_prefix(':').unwrap_or(rest);
    for _ in 0..2 {
        rest = rest.strip_prefix('/').unwrap_or(rest);
    }

    rest.parse()
        .map_err(|_| WakeTargetError::Malformed(target.to_string()))
}

/// Trait for sending wake-on-LAN bursts
#[async_trait]
pub trait Waker: Send + Sync {
    async fn wake(&self, mac: MacAddress) -> std::io::Result<()>;
}

/// Broadcasts the magic packet over UDP.
#[derive(Debug, Clone)]
pub struct UdpWaker {
    target: SocketAddr,
    packets: usize,
    interval: Duration,
}

impl Default for UdpWaker {
    fn default() -> Self {
        Self {
            target: SocketAddr::from((Ipv4Addr::BROADCAST, 9)),
            packets: 20,
            interval: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl Waker for UdpWaker {
    async fn wake(&self, mac: MacAddress) -> std::io::Result<()> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.set_broadcast(true)?;

        let packet = mac.magic_packet();
        for sent in 1..=self.packets {
            socket.send_to(&packet, self.target).await?;
            if sent < self.packets {
                tokio::time::sleep(self.interval).await;
            }
        }

        debug!("Sent {} magic packets to {}", self.packets, mac);
        Ok(())
    }
}

/// Mock waker for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockWaker {
    /// When each burst started
    pub wakes: std::sync::Mutex<Vec<(MacAddress, tokio::time::Instant)>>,

    /// How long each burst takes to send
    pub burst: Duration,
}

#[cfg(test)]
#[async_trait]
impl Waker for MockWaker {
    async fn wake(&self, mac: MacAddress) -> std::io::Result<()> {
        self.wakes
            .lock()
            .unwrap()
            .push((mac, tokio::time::Instant::now()));
        tokio::time::sleep(self.burst).await;
        Ok(())
    }
}
