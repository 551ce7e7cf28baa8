use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;

use super::diagnostics::{
    format_diagnostics, Diagnostic, Error, LoadError, ValidationError, Warning,
};
use super::normalize::{normalize, Normalized, RawDeviceConfig};
use super::partial::{PartialApiConfig, PartialConfig, PartialTvConfig};
use crate::tv::InputDescriptor;

pub const DEFAULT_API_LISTEN: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 8565;

#[derive(Debug)]
pub struct Config {
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub tv: DeviceConfig,
}

// LogLevel needs Deserialize because it's used in PartialLoggingConfig with toml::Spanned
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: LogLevel,

    pub overrides: HashMap<String, LogLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub enabled: bool,
    pub listen: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: DEFAULT_API_LISTEN.to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

/// Normalized television settings. Every duration is within its bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub name: String,
    pub address: String,
    pub wake_address: Option<String>,
    pub protocol: String,
    pub port: u16,
    pub api_version: u32,
    pub timeout: Duration,
    pub polling_interval: Duration,
    pub startup_wait: Duration,
    pub input_delay: Duration,
    pub channel_popup_wait: Duration,
    pub has_ambient_light: bool,
    pub has_ambient_color_extension: bool,
    pub power_on_cascade: bool,
    pub power_off_cascade: bool,
    pub has_no_channels: bool,
    pub inputs: Vec<InputDescriptor>,
}

impl DeviceConfig {
    /// `{protocol}://{address}:{port}/{api_version}`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol, self.address, self.port, self.api_version
        )
    }

    /// Whether the ambient light is managed at all.
    pub fn ambient_enabled(&self) -> bool {
        self.has_ambient_color_extension
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Rendered diagnostics, errors and warnings together
    #[error("{0}")]
    Invalid(String),
}

/// Numeric value of a TOML scalar. Anything else is NaN so that it gets replaced.
fn numeric(value: &toml::Value) -> f64 {
    match value {
        toml::Value::Integer(i) => *i as f64,
        toml::Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

impl Config {
    /// Load configuration from multiple TOML files with import resolution
    ///
    /// Returns Ok((Config, diagnostics)) where diagnostics contains warnings.
    /// Returns Err if any diagnostic is an error, with every diagnostic rendered.
    pub fn from_files(paths: &[PathBuf]) -> Result<(Self, Vec<Diagnostic>), ConfigError> {
        let configs = PartialConfig::load_with_imports(paths)?;

        // Merge with first-wins semantics, collecting diagnostics
        let (partial, diagnostics) = PartialConfig::merge(configs);

        Self::from_partial(partial, diagnostics)
    }

    /// Convert a PartialConfig to a Config, validating all fields
    pub fn from_partial(
        partial: PartialConfig,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Result<(Self, Vec<Diagnostic>), ConfigError> {
        let logging = if let Some(partial_logging) = partial.logging {
            LoggingConfig {
                level: partial_logging
                    .level
                    .map(|s| *s.get_ref())
                    .unwrap_or_default(),
                overrides: partial_logging
                    .overrides
                    .map(|hm| hm.into_iter().map(|(k, v)| (k, *v.get_ref())).collect())
                    .unwrap_or_default(),
            }
        } else {
            LoggingConfig::default()
        };

        let api = Self::api_config(partial.api.unwrap_or_default());

        let tv_partial = partial.tv.unwrap_or_default();
        let address = tv_partial
            .address
            .as_ref()
            .map(|a| a.get_ref().trim().to_string())
            .unwrap_or_default();
        if address.is_empty() {
            diagnostics.push(Diagnostic::Error(Error::Validation(ValidationError {
                field_path: "tv.address".to_string(),
                message: "address is required".to_string(),
                location: partial.origins.get("tv.address").cloned(),
            })));
        }

        let Normalized {
            config: tv,
            adjustments,
        } = normalize(Self::raw_device_config(tv_partial));

        diagnostics.extend(adjustments.into_iter().map(|adjustment| {
            let field_path = format!("tv.{}", adjustment.field);
            let location = partial.origins.get(&field_path).cloned();
            Diagnostic::Warning(Warning::Adjusted {
                field_path,
                message: adjustment.message,
                location,
            })
        }));

        let has_errors = diagnostics.iter().any(|d| d.is_error());

        if has_errors {
            Err(ConfigError::Invalid(format_diagnostics(&diagnostics)))
        } else {
            Ok((Config { logging, api, tv }, diagnostics))
        }
    }

    fn api_config(partial: PartialApiConfig) -> ApiConfig {
        let defaults = ApiConfig::default();
        ApiConfig {
            enabled: partial
                .enabled
                .map(|s| s.into_inner())
                .unwrap_or(defaults.enabled),
            listen: partial
                .listen
                .map(|s| s.into_inner())
                .unwrap_or(defaults.listen),
            port: partial.port.map(|s| s.into_inner()).unwrap_or(defaults.port),
        }
    }

    fn raw_device_config(partial: PartialTvConfig) -> RawDeviceConfig {
        let timing = |value: Option<toml::Spanned<toml::Value>>| value.map(|v| numeric(v.get_ref()));

        RawDeviceConfig {
            name: partial.name.map(|s| s.into_inner()),
            address: partial
                .address
                .map(|s| s.into_inner())
                .unwrap_or_default(),
            wake_address: partial.wake_address.map(|s| s.into_inner()),
            protocol: partial.protocol.map(|s| s.into_inner()),
            port: partial.api_port.map(|s| s.into_inner()),
            api_version: partial.api_version.map(|s| s.into_inner()),
            timeout: timing(partial.timeout),
            polling_interval: timing(partial.polling_interval),
            startup_wait: timing(partial.startup_time),
            input_delay: timing(partial.input_delay),
            channel_popup_wait: timing(partial.channel_setup_popup_time),
            has_tv_channels: partial.has_tv_channels.map(|s| s.into_inner()),
            has_ambient_light: partial.has_ambilight.map(|s| s.into_inner()),
            has_ambient_color_extension: partial.has_ambihue.map(|s| s.into_inner()),
            power_on_cascade: partial.ambi_poweron.map(|s| s.into_inner()),
            power_off_cascade: partial.ambi_poweroff.map(|s| s.into_inner()),
            inputs: partial.inputs.map(|s| s.into_inner()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tv::InputType;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    const MINIMAL: &str = "[tv]\naddress = \"192.168.1.20\"\n";

    #[test]
    fn test_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "saphid.toml", MINIMAL);

        let (config, diagnostics) = Config::from_files(&[path]).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.tv.base_url(), "http://192.168.1.20:1925/6");
        assert_eq!(config.tv.polling_interval, Duration::from_secs(30));
        assert!(config.tv.has_no_channels);
        assert!(config.tv.inputs.is_empty());
    }

    #[test]
    fn test_full_tv_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "saphid.toml",
            r#"
[api]
listen = "0.0.0.0"
port = 9000

[tv]
name = "Living Room"
address = "tv.lan"
wake_address = "wol://aa:bb:cc:dd:ee:ff"
protocol = "https"
api_port = 1926
startup_time = 12
polling_interval = 20.5
input_delay = 400
timeout = 3
has_tv_channels = true
has_ambilight = true
has_ambihue = true
ambi_poweron = true

[[tv.inputs]]
name = "Netflix"
type = "app"
position = 2

[[tv.inputs]]
name = "BBC One"
type = "channel"
position = 101
expose_as_switch = true
"#,
        );

        let (config, diagnostics) = Config::from_files(&[path]).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        assert_eq!(config.api.listen, "0.0.0.0");
        assert_eq!(config.api.port, 9000);

        let tv = config.tv;
        assert_eq!(tv.name, "Living Room");
        assert_eq!(tv.base_url(), "https://tv.lan:1926/6");
        assert_eq!(tv.wake_address.as_deref(), Some("wol://aa:bb:cc:dd:ee:ff"));
        assert_eq!(tv.startup_wait, Duration::from_secs(12));
        assert_eq!(tv.polling_interval, Duration::from_millis(20_500));
        assert_eq!(tv.input_delay, Duration::from_millis(400));
        assert_eq!(tv.timeout, Duration::from_secs(3));
        assert!(!tv.has_no_channels);
        assert!(tv.ambient_enabled());
        assert!(tv.power_on_cascade);
        assert!(!tv.power_off_cascade);

        assert_eq!(tv.inputs.len(), 2);
        assert_eq!(tv.inputs[0].kind, InputType::App);
        assert_eq!(tv.inputs[1].position, 101);
        assert!(tv.inputs[1].expose_as_switch);
    }

    #[test]
    fn test_out_of_range_values_warn() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "saphid.toml",
            r#"
[tv]
address = "tv.lan"
polling_interval = 5
input_delay = "fast"
"#,
        );

        let (config, diagnostics) = Config::from_files(&[path]).unwrap();
        assert_eq!(config.tv.polling_interval, Duration::from_secs(30));
        assert_eq!(config.tv.input_delay, Duration::from_millis(600));

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.is_warning()));

        let rendered = format_diagnostics(&diagnostics);
        assert!(rendered.contains("tv.polling_interval"));
        assert!(rendered.contains("tv.input_delay"));
    }

    #[test]
    fn test_missing_address_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "saphid.toml", "[tv]\nname = \"Bedroom\"\n");

        let err = Config::from_files(&[path]).unwrap_err().to_string();
        assert!(err.contains("tv.address"), "{err}");
        assert!(err.contains("address is required"), "{err}");
    }

    #[test]
    fn test_merge_non_overlapping_configs() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(
            dir.path(),
            "base.toml",
            "[logging]\nlevel = \"info\"\n\n[tv]\naddress = \"tv.lan\"\n",
        );
        let extra = write(
            dir.path(),
            "extra.toml",
            "[logging.overrides]\n\"saphid::api\" = \"debug\"\n\n[tv]\nwake_address = \"aa:bb:cc:dd:ee:ff\"\n",
        );

        let (config, diagnostics) = Config::from_files(&[base, extra]).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(
            config.logging.overrides.get("saphid::api"),
            Some(&LogLevel::Debug)
        );
        assert_eq!(config.tv.address, "tv.lan");
        assert!(config.tv.wake_address.is_some());
    }

    #[test]
    fn test_multiple_conflicts_reported() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(
            dir.path(),
            "base.toml",
            r#"
[logging]
level = "info"

[logging.overrides]
"target1" = "trace"

[tv]
address = "tv.lan"
"#,
        );
        let conflict = write(
            dir.path(),
            "conflict.toml",
            r#"
[logging]
level = "debug"

[logging.overrides]
"target1" = "error"

[tv]
address = "other.lan"
"#,
        );

        let err = Config::from_files(&[base, conflict]).unwrap_err().to_string();
        assert!(err.contains("Merge conflict"));
        assert!(err.contains("logging.level"));
        assert!(err.contains("logging.overrides.target1"));
        assert!(err.contains("tv.address"));
    }

    #[test]
    fn test_relative_import_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "configs/tv.toml", MINIMAL);
        let main = write(
            dir.path(),
            "main.toml",
            "imports = [\"configs/tv.toml\"]\n\n[logging]\nlevel = \"debug\"\n",
        );

        let (config, _) = Config::from_files(&[main]).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.tv.address, "192.168.1.20");
    }

    #[test]
    fn test_import_cycle_detection() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.toml", "imports = [\"b.toml\"]\n");
        write(dir.path(), "b.toml", "imports = [\"a.toml\"]\n");

        let err = Config::from_files(&[a]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Load(LoadError::ImportCycle { .. })
        ));
    }

    #[test]
    fn test_shared_import_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "common.toml", MINIMAL);
        let a = write(
            dir.path(),
            "a.toml",
            "imports = [\"common.toml\"]\n\n[logging]\nlevel = \"debug\"\n",
        );
        let b = write(
            dir.path(),
            "b.toml",
            "imports = [\"common.toml\"]\n\n[api]\nport = 9000\n",
        );

        let (config, diagnostics) = Config::from_files(&[a, b]).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(config.tv.address, "192.168.1.20");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.api.port, 9000);
    }

    #[test]
    fn test_empty_config_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write(dir.path(), "empty.toml", "");
        let tv = write(dir.path(), "tv.toml", MINIMAL);

        let (_, diagnostics) = Config::from_files(&[empty, tv]).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_warning());
    }

    #[test]
    fn test_missing_file_error() {
        let missing = PathBuf::from("/nonexistent/saphid.toml");

        let err = Config::from_files(&[missing]).unwrap_err().to_string();
        assert!(err.contains("Failed to read"));
        assert!(err.contains("/nonexistent/saphid.toml"));
    }
}
