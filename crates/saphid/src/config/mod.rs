mod config;
mod diagnostics;
mod normalize;
mod partial;

pub use config::*;
pub use diagnostics::{format_diagnostics, Diagnostic, LoadError};
pub use normalize::{clamp_duration, normalize, Adjustment, Bound, Normalized, RawDeviceConfig};
