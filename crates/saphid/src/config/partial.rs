use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::diagnostics::{Diagnostic, Error, LoadError, MergeError, SourceInfo, SourceLocation, Warning};
use super::LogLevel;
use crate::tv::InputDescriptor;

type Spanned<T> = toml::Spanned<T>;

#[derive(Debug, Default, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub imports: Vec<String>,

    pub logging: Option<PartialLoggingConfig>,
    pub api: Option<PartialApiConfig>,
    pub tv: Option<PartialTvConfig>,

    /// Source information for error reporting (not serialized)
    #[serde(skip)]
    pub source: Option<SourceInfo>,

    /// Where each merged field was defined, keyed by field path (filled in by `merge`)
    #[serde(skip)]
    pub origins: HashMap<String, SourceLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialLoggingConfig {
    pub level: Option<Spanned<LogLevel>>,
    pub overrides: Option<HashMap<String, Spanned<LogLevel>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialApiConfig {
    pub enabled: Option<Spanned<bool>>,
    pub listen: Option<Spanned<String>>,
    pub port: Option<Spanned<u16>>,
}

/// The `[tv]` section. Timing values stay as raw TOML so that strings and other
/// non-numbers can be reported and replaced instead of failing the parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialTvConfig {
    pub name: Option<Spanned<String>>,
    pub address: Option<Spanned<String>>,
    pub wake_address: Option<Spanned<String>>,
    pub protocol: Option<Spanned<String>>,
    pub api_port: Option<Spanned<u16>>,
    pub api_version: Option<Spanned<u32>>,
    pub startup_time: Option<Spanned<toml::Value>>,
    pub polling_interval: Option<Spanned<toml::Value>>,
    pub input_delay: Option<Spanned<toml::Value>>,
    pub timeout: Option<Spanned<toml::Value>>,
    pub channel_setup_popup_time: Option<Spanned<toml::Value>>,
    pub has_tv_channels: Option<Spanned<bool>>,
    pub has_ambilight: Option<Spanned<bool>>,
    pub has_ambihue: Option<Spanned<bool>>,
    pub ambi_poweron: Option<Spanned<bool>>,
    pub ambi_poweroff: Option<Spanned<bool>>,
    pub inputs: Option<Spanned<Vec<InputDescriptor>>>,
}

impl PartialConfig {
    /// Load a single config file without processing imports
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut config: PartialConfig = toml::from_str(&content).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            error: e,
        })?;

        config.source = Some(SourceInfo {
            file_path: path.to_path_buf(),
            content,
        });

        Ok(config)
    }

    /// Load config files with import resolution
    ///
    /// Each config file is loaded, then its imports are recursively processed.
    /// Cycle detection prevents infinite loops.
    ///
    /// A file reached through more than one import is loaded once, at its first
    /// occurrence.
    ///
    /// Returns a Vec of all loaded configs in order (imports first, then parent)
    pub fn load_with_imports(paths: &[PathBuf]) -> Result<Vec<Self>, LoadError> {
        let mut visited = HashSet::new();
        let mut loaded = HashSet::new();
        let mut all_configs = Vec::new();

        for path in paths {
            Self::load_recursive(path, &mut visited, &mut loaded, &mut all_configs)?;
        }

        Ok(all_configs)
    }

    fn load_recursive(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        loaded: &mut HashSet<PathBuf>,
        configs: &mut Vec<Self>,
    ) -> Result<(), LoadError> {
        let canonical_path = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        // `visited` is the current import chain; `loaded` is everything already pushed
        if visited.contains(&canonical_path) {
            return Err(LoadError::ImportCycle {
                path: canonical_path.clone(),
                cycle: visited.iter().cloned().collect(),
            });
        }

        if loaded.contains(&canonical_path) {
            return Ok(());
        }

        visited.insert(canonical_path.clone());

        let config = Self::from_file(path)?;

        for import_path in &config.imports {
            let import_path_buf = PathBuf::from(import_path);

            // Relative imports resolve against the importing file
            let resolved_path = if import_path_buf.is_absolute() {
                import_path_buf
            } else {
                let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
                parent_dir.join(import_path_buf)
            };

            Self::load_recursive(&resolved_path, visited, loaded, configs)?;
        }

        configs.push(config);

        visited.remove(&canonical_path);
        loaded.insert(canonical_path);

        Ok(())
    }

    /// Merge multiple partial configs together
    ///
    /// Uses first-wins semantics: the first occurrence of a field is kept.
    /// Conflicts (same field defined in multiple configs) are collected as errors
    /// but merging continues to find all conflicts at once.
    ///
    /// Returns (merged, diagnostics) where diagnostics may contain warnings and errors
    pub fn merge<I>(configs: I) -> (Self, Vec<Diagnostic>)
    where
        I: IntoIterator<Item = Self>,
    {
        let mut result = PartialConfig::default();
        let mut diagnostics = Vec::new();
        let mut imports = Vec::new();

        for config in configs {
            imports.extend(config.imports.clone());

            let source = config.source.clone().unwrap_or_else(|| SourceInfo {
                file_path: PathBuf::from("<unknown>"),
                content: String::new(),
            });

            let is_empty = config.logging.is_none()
                && config.api.is_none()
                && config.tv.is_none()
                && config.imports.is_empty();

            if is_empty {
                diagnostics.push(Diagnostic::Warning(Warning::EmptyConfig {
                    file_path: source.file_path.clone(),
                }));
            }

            let mut merger = Merger {
                source: &source,
                origins: &mut result.origins,
                diagnostics: &mut diagnostics,
            };

            if let Some(logging) = config.logging {
                let target = result.logging.get_or_insert_with(Default::default);
                merger.field("logging.level", &mut target.level, logging.level);

                for (key, value) in logging.overrides.unwrap_or_default() {
                    let mut slot = None;
                    merger.field(&format!("logging.overrides.{}", key), &mut slot, Some(value));
                    if let Some(value) = slot {
                        target
                            .overrides
                            .get_or_insert_with(HashMap::new)
                            .insert(key, value);
                    }
                }
            }

            if let Some(api) = config.api {
                let target = result.api.get_or_insert_with(Default::default);
                merger.field("api.enabled", &mut target.enabled, api.enabled);
                merger.field("api.listen", &mut target.listen, api.listen);
                merger.field("api.port", &mut target.port, api.port);
            }

            if let Some(tv) = config.tv {
                let target = result.tv.get_or_insert_with(Default::default);
                target.merge_from(tv, &mut merger);
            }
        }

        result.imports = imports;

        (result, diagnostics)
    }
}

impl PartialTvConfig {
    fn merge_from(&mut self, other: PartialTvConfig, merger: &mut Merger<'_>) {
        merger.field("tv.name", &mut self.name, other.name);
        merger.field("tv.address", &mut self.address, other.address);
        merger.field("tv.wake_address", &mut self.wake_address, other.wake_address);
        merger.field("tv.protocol", &mut self.protocol, other.protocol);
        merger.field("tv.api_port", &mut self.api_port, other.api_port);
        merger.field("tv.api_version", &mut self.api_version, other.api_version);
        merger.field("tv.startup_time", &mut self.startup_time, other.startup_time);
        merger.field(
            "tv.polling_interval",
            &mut self.polling_interval,
            other.polling_interval,
        );
        merger.field("tv.input_delay", &mut self.input_delay, other.input_delay);
        merger.field("tv.timeout", &mut self.timeout, other.timeout);
        merger.field(
            "tv.channel_setup_popup_time",
            &mut self.channel_setup_popup_time,
            other.channel_setup_popup_time,
        );
        merger.field(
            "tv.has_tv_channels",
            &mut self.has_tv_channels,
            other.has_tv_channels,
        );
        merger.field("tv.has_ambilight", &mut self.has_ambilight, other.has_ambilight);
        merger.field("tv.has_ambihue", &mut self.has_ambihue, other.has_ambihue);
        merger.field("tv.ambi_poweron", &mut self.ambi_poweron, other.ambi_poweron);
        merger.field("tv.ambi_poweroff", &mut self.ambi_poweroff, other.ambi_poweroff);
        merger.field("tv.inputs", &mut self.inputs, other.inputs);
    }
}

/// First-wins field merging for one source file.
struct Merger<'a> {
    source: &'a SourceInfo,
    origins: &'a mut HashMap<String, SourceLocation>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Merger<'_> {
    fn field<T>(&mut self, field_path: &str, target: &mut Option<Spanned<T>>, incoming: Option<Spanned<T>>) {
        let Some(value) = incoming else {
            return;
        };

        let location = SourceLocation::new(self.source, value.span());

        if let Some(previous) = self.origins.get(field_path) {
            // Conflict: keep first value, record error
            self.diagnostics.push(Diagnostic::Error(Error::Merge(MergeError {
                field_path: field_path.to_string(),
                message: format!("'{}' defined in multiple config files", field_path),
                conflicts: vec![previous.clone(), location],
            })));
        } else {
            *target = Some(value);
            self.origins.insert(field_path.to_string(), location);
        }
    }
}
