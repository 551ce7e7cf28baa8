use std::error::Error as _;

/// Failure of a single request against the television's control surface.
///
/// Get-style calls fold these into a [`Reading`](super::Reading): host-unreachable and
/// non-200 responses mean "assume off", anything else means "keep the last value".
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("request timed out")]
    Timeout,

    #[error("host unreachable")]
    Unreachable,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl DeviceError {
    /// Whether this failure should force the observed value to inactive.
    pub fn forces_inactive(&self) -> bool {
        matches!(self, DeviceError::Unreachable | DeviceError::Status(_))
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return DeviceError::Timeout;
        }
        if let Some(status) = err.status() {
            return DeviceError::Status(status.as_u16());
        }
        if err.is_decode() {
            return DeviceError::Body(err.to_string());
        }

        // hyper buries the socket error a few levels down
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                if io.raw_os_error() == Some(libc::EHOSTUNREACH) {
                    return DeviceError::Unreachable;
                }
            }
            source = cause.source();
        }

        DeviceError::Transport(err.to_string())
    }
}
