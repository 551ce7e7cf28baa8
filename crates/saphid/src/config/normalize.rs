//! Bounds every timing parameter and input cursor distance to a safe operating range
//! and fills in endpoint defaults. Pure: no I/O, no logging.

use std::time::Duration;

use super::DeviceConfig;
use crate::tv::{InputDescriptor, InputType, MAX_CURSOR_STEPS};

pub const DEFAULT_NAME: &str = "Television";
pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_PORT: u16 = 1925;
pub const DEFAULT_API_VERSION: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Seconds,
    Milliseconds,
}

/// Minimum and fallback for one duration field.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub field: &'static str,
    pub unit: Unit,
    pub minimum_ms: u64,
    pub default_ms: u64,
}

pub const STARTUP_WAIT: Bound = Bound {
    field: "startup_time",
    unit: Unit::Seconds,
    minimum_ms: 5_000,
    default_ms: 10_000,
};

pub const POLLING_INTERVAL: Bound = Bound {
    field: "polling_interval",
    unit: Unit::Seconds,
    minimum_ms: 15_000,
    default_ms: 30_000,
};

pub const INPUT_DELAY: Bound = Bound {
    field: "input_delay",
    unit: Unit::Milliseconds,
    minimum_ms: 150,
    default_ms: 600,
};

pub const TIMEOUT: Bound = Bound {
    field: "timeout",
    unit: Unit::Seconds,
    minimum_ms: 2_000,
    default_ms: 5_000,
};

pub const CHANNEL_POPUP_WAIT: Bound = Bound {
    field: "channel_setup_popup_time",
    unit: Unit::Milliseconds,
    minimum_ms: 0,
    default_ms: 5_000,
};

/// Largest accepted duration; anything above is treated like garbage.
const MAX_MS: f64 = 1e12;

/// A field whose configured value was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub field: &'static str,
    pub message: String,
}

/// Configuration as read, before any bounds are applied.
///
/// Durations are in the units the configuration file uses (see [`Bound::unit`]);
/// a non-numeric value should be passed as `Some(f64::NAN)`.
#[derive(Debug, Clone, Default)]
pub struct RawDeviceConfig {
    pub name: Option<String>,
    pub address: String,
    pub wake_address: Option<String>,
    pub protocol: Option<String>,
    pub port: Option<u16>,
    pub api_version: Option<u32>,
    pub timeout: Option<f64>,
    pub polling_interval: Option<f64>,
    pub startup_wait: Option<f64>,
    pub input_delay: Option<f64>,
    pub channel_popup_wait: Option<f64>,
    pub has_tv_channels: Option<bool>,
    pub has_ambient_light: Option<bool>,
    pub has_ambient_color_extension: Option<bool>,
    pub power_on_cascade: Option<bool>,
    pub power_off_cascade: Option<bool>,
    pub inputs: Vec<InputDescriptor>,
}

impl RawDeviceConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: DeviceConfig,
    pub adjustments: Vec<Adjustment>,
}

/// Clamp one duration. A missing value silently takes the default; a value that is
/// NaN, non-finite, negative or below the minimum takes the default and is reported.
pub fn clamp_duration(raw: Option<f64>, bound: &Bound) -> (Duration, Option<Adjustment>) {
    let default = Duration::from_millis(bound.default_ms);
    let Some(raw) = raw else {
        return (default, None);
    };

    let ms = match bound.unit {
        Unit::Seconds => raw * 1000.0,
        Unit::Milliseconds => raw,
    };

    if ms.is_finite() && ms >= bound.minimum_ms as f64 && ms <= MAX_MS {
        return (Duration::from_micros((ms * 1000.0).round() as u64), None);
    }

    let unit = match bound.unit {
        Unit::Seconds => "s",
        Unit::Milliseconds => "ms",
    };
    let shown = if raw.is_nan() {
        "a non-numeric value".to_string()
    } else {
        format!("{}{}", raw, unit)
    };
    let adjustment = Adjustment {
        field: bound.field,
        message: format!(
            "{} is not a valid duration of at least {}ms; using {}ms",
            shown, bound.minimum_ms, bound.default_ms
        ),
    };
    (default, Some(adjustment))
}

/// Clamp a non-channel input's cursor distance to what a plan will walk.
fn bound_input(mut input: InputDescriptor, adjustments: &mut Vec<Adjustment>) -> InputDescriptor {
    if input.kind != InputType::Channel && input.position.unsigned_abs() > MAX_CURSOR_STEPS.unsigned_abs() {
        let clamped = input.position.clamp(-MAX_CURSOR_STEPS, MAX_CURSOR_STEPS);
        adjustments.push(Adjustment {
            field: "inputs",
            message: format!(
                "input '{}': position {} is beyond the {}-step cursor walk; using {}",
                input.name, input.position, MAX_CURSOR_STEPS, clamped
            ),
        });
        input.position = clamped;
    }
    input
}

pub fn normalize(raw: RawDeviceConfig) -> Normalized {
    let mut adjustments = Vec::new();
    let mut duration = |value: Option<f64>, bound: &Bound| {
        let (duration, adjustment) = clamp_duration(value, bound);
        adjustments.extend(adjustment);
        duration
    };

    let timeout = duration(raw.timeout, &TIMEOUT);
    let polling_interval = duration(raw.polling_interval, &POLLING_INTERVAL);
    let startup_wait = duration(raw.startup_wait, &STARTUP_WAIT);
    let input_delay = duration(raw.input_delay, &INPUT_DELAY);
    let channel_popup_wait = duration(raw.channel_popup_wait, &CHANNEL_POPUP_WAIT);

    let inputs = raw
        .inputs
        .into_iter()
        .map(|input| bound_input(input, &mut adjustments))
        .collect();

    // Only an explicit "no ambilight" disables the colour extension
    let has_ambient_color_extension = raw.has_ambient_color_extension.unwrap_or(false)
        && raw.has_ambient_light != Some(false);

    let wake_address = raw
        .wake_address
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty());

    let config = DeviceConfig {
        name: raw.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
        address: raw.address.trim().to_string(),
        wake_address,
        protocol: raw
            .protocol
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
        port: raw.port.unwrap_or(DEFAULT_PORT),
        api_version: raw.api_version.unwrap_or(DEFAULT_API_VERSION),
        timeout,
        polling_interval,
        startup_wait,
        input_delay,
        channel_popup_wait,
        has_ambient_light: raw.has_ambient_light.unwrap_or(false),
        has_ambient_color_extension,
        power_on_cascade: raw.power_on_cascade.unwrap_or(false),
        power_off_cascade: raw.power_off_cascade.unwrap_or(false),
        has_no_channels: !raw.has_tv_channels.unwrap_or(false),
        inputs,
    };

    Normalized {
        config,
        adjustments,
    }
}
