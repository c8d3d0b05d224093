//! Discovery of `corollary.yaml`.
//!
//! An explicit path wins, then the `COROLLARY_CONFIG` environment variable,
//! then the first `corollary.yaml` found walking up from the working
//! directory. Without any file the defaults apply.

use crate::config::{ConfigError, CorollaryConfig, Result, load_config};
use std::path::{Path, PathBuf};

/// The name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "corollary.yaml";

/// The name of the environment variable that can point at a configuration file.
pub const CONFIG_ENV: &str = "COROLLARY_CONFIG";

/// Configuration together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadedConfig {
    /// `None` when no file was found and the defaults apply.
    pub path: Option<PathBuf>,
    pub config: CorollaryConfig,
}

/// Walk up the directory tree from `start` looking for `corollary.yaml`.
///
/// Returns `None` if the filesystem root is reached without finding one.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent;
            }
            _ => break, // Reached filesystem root.
        }
    }

    None
}

/// Locate and load the configuration.
///
/// `explicit` is the `--config` command-line value, `env` the value of
/// [`CONFIG_ENV`]; both must name an existing file.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if an explicitly named file is missing,
/// or any error from [`load_config`].
pub fn load_discovered(start: &Path, explicit: Option<&Path>, env: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit.or(env) {
        Some(path) => {
            let path = if path.is_relative() {
                start.join(path)
            } else {
                path.to_path_buf()
            };
            if !path.is_file() {
                return Err(ConfigError::NotFound(path));
            }
            Some(path)
        }
        None => find_config_file(start),
    };

    let config = match &path {
        Some(path) => load_config(path)?,
        None => CorollaryConfig::default(),
    };
    Ok(LoadedConfig { path, config })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_in_child() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "command-sources: [lemma]\n").unwrap();

        let child = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&child).unwrap();

        let found = find_config_file(&child).unwrap();
        // Canonicalize both for comparison (handles symlinks, /tmp vs /private/tmp).
        assert_eq!(found.canonicalize().unwrap(), file.canonicalize().unwrap());
    }

    #[test]
    fn test_explicit_path_wins_over_env_and_walk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "command-sources: [walked]\n").unwrap();
        let explicit = dir.path().join("explicit.yaml");
        std::fs::write(&explicit, "command-sources: [explicit]\n").unwrap();
        let env = dir.path().join("env.yaml");
        std::fs::write(&env, "command-sources: [env]\n").unwrap();

        let loaded = load_discovered(dir.path(), Some(&explicit), Some(&env)).unwrap();
        assert_eq!(loaded.config.command_sources, vec!["explicit"]);
        assert_eq!(loaded.path, Some(explicit));

        let loaded = load_discovered(dir.path(), None, Some(Path::new("env.yaml"))).unwrap();
        assert_eq!(loaded.config.command_sources, vec!["env"]);

        let loaded = load_discovered(dir.path(), None, None).unwrap();
        assert_eq!(loaded.config.command_sources, vec!["walked"]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_discovered(dir.path(), Some(Path::new("nope.yaml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
