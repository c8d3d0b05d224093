//! Configuration types and loading.
//!
//! The main entry point is [`CorollaryConfig`], which represents the contents
//! of `corollary.yaml`. Configuration is loaded with [`load_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// An explicitly requested configuration file does not exist.
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Maven invocation settings used by the Maven commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MavenConfig {
    /// The Maven executable.
    #[serde(default = "default_maven_program")]
    pub program: String,

    /// Log file name, relative to the target directory.
    #[serde(default = "default_maven_log_file", rename = "log-file")]
    pub log_file: String,
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            program: default_maven_program(),
            log_file: default_maven_log_file(),
        }
    }
}

fn default_maven_program() -> String {
    "mvn".to_string()
}

fn default_maven_log_file() -> String {
    "mvn.log".to_string()
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full corollary configuration, corresponding to `corollary.yaml`.
///
/// All fields use `serde` defaults so that a partially-specified YAML file
/// will be deserialized correctly with sensible default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorollaryConfig {
    /// Command sources registered for every run, in order.
    #[serde(default = "default_command_sources", rename = "command-sources")]
    pub command_sources: Vec<String>,

    /// Target directory used when none is given on the command line.
    #[serde(default, rename = "target-directory")]
    pub target_directory: Option<PathBuf>,

    /// Directories searched for formulas referenced by name.
    #[serde(default, rename = "formula-dirs")]
    pub formula_dirs: Vec<PathBuf>,

    /// Maven settings.
    #[serde(default)]
    pub maven: MavenConfig,
}

impl Default for CorollaryConfig {
    fn default() -> Self {
        Self {
            command_sources: default_command_sources(),
            target_directory: None,
            formula_dirs: Vec::new(),
            maven: MavenConfig::default(),
        }
    }
}

fn default_command_sources() -> Vec<String> {
    vec!["lemma".to_string()]
}

impl CorollaryConfig {
    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for blank command source names or
    /// a blank Maven program.
    pub fn validate(&self) -> Result<()> {
        if self.command_sources.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "command-sources".to_string(),
                reason: "source names must not be empty".to_string(),
            });
        }
        if self.maven.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "maven.program".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve relative paths against `base`, the directory holding the
    /// configuration file.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(target) = &self.target_directory {
            if target.is_relative() {
                self.target_directory = Some(base.join(target));
            }
        }
        for dir in &mut self.formula_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from the file at `path`.
///
/// If the file does not exist, a default [`CorollaryConfig`] is returned.
/// Relative paths in the file are resolved against the file's directory.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
/// [`ConfigError::ParseError`] if it contains invalid YAML, or
/// [`ConfigError::InvalidValue`] if a value fails validation.
pub fn load_config(path: &Path) -> Result<CorollaryConfig> {
    if !path.exists() {
        return Ok(CorollaryConfig::default());
    }

    let content = std::fs::read_to_string(path)?;

    // An empty file is valid and yields default config.
    if content.trim().is_empty() {
        return Ok(CorollaryConfig::default());
    }

    let mut config: CorollaryConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
