//! TOML-based configuration for the tsdecl build target.
//!
//! Every section is optional. Relative paths in `[target]` resolve against
//! the directory holding the config file (for `root`) and against `root`
//! (for everything else).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::mirror::MirrorOptions;
use crate::paths::resolve_lexically;
use crate::target::BuildInput;

/// Conventional config file name.
pub const CONFIG_FILE: &str = "tsdecl.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level tool configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Paths of the build target.
    #[serde(default)]
    pub target: TargetConfig,

    /// Source tree mirroring filters.
    #[serde(default)]
    pub mirror: MirrorOptions,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Where to read sources and write declarations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Project root (default `.`).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Source directory, relative to root (default `src`).
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Output directory, relative to root (default `lib/typescript`).
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// tsconfig to build, relative to root (default `tsconfig.json`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<PathBuf>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_source() -> PathBuf {
    PathBuf::from("src")
}
fn default_output() -> PathBuf {
    PathBuf::from("lib/typescript")
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            source: default_source(),
            output: default_output(),
            tsconfig: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ToolConfig {
    /// Load a [`ToolConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate that paths are usable and the log level is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("target.root", &self.target.root),
            ("target.source", &self.target.source),
            ("target.output", &self.target.output),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "path must not be empty".into(),
                });
            }
        }

        let root = resolve_lexically(Path::new("/"), &self.target.root);
        let source = resolve_lexically(&root, &self.target.source);
        let output = resolve_lexically(&root, &self.target.output);
        if output == root {
            return Err(ConfigError::InvalidValue {
                field: "target.output".into(),
                detail: "output directory must not be the project root".into(),
            });
        }
        if output == source || source.starts_with(&output) {
            return Err(ConfigError::InvalidValue {
                field: "target.output".into(),
                detail: "output directory must not contain the source directory".into(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_level".into(),
                detail: format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Absolute [`BuildInput`] for this config.
    ///
    /// `base_dir` anchors a relative `root`, usually the config file's
    /// directory or the current directory.
    pub fn build_input(&self, base_dir: &Path, search_path: Option<OsString>) -> BuildInput {
        let root = resolve_lexically(base_dir, &self.target.root);
        BuildInput {
            source: resolve_lexically(&root, &self.target.source),
            output: resolve_lexically(&root, &self.target.output),
            tsconfig: self
                .target
                .tsconfig
                .as_ref()
                .map(|p| resolve_lexically(&root, p)),
            search_path,
            mirror: self.mirror.clone(),
            root,
        }
    }

    /// The default configuration rendered as TOML, for `init`.
    pub fn default_toml() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
