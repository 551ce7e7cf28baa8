pub mod api;
pub mod config;
pub mod device;
pub mod tv;

pub use config::Config;
pub use config::Diagnostic;
pub use config::LogLevel;
pub use config::format_diagnostics;
pub use tv::AccessoryHooks;
pub use tv::Television;
