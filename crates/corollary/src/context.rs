//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds all the state a command handler needs:
//! global flags, the working directory and the discovered configuration.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use corollary_commands::{SOURCE_NAMES, command_source};
use corollary_config::discovery::CONFIG_ENV;
use corollary_config::{CorollaryConfig, LoadedConfig, load_discovered};
use corollary_core::Registry;
use corollary_formula::find_formula;
use tracing::debug;

use crate::cli::{GlobalArgs, SourceArgs};

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Whether to produce JSON output.
    pub json: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    /// Directory relative paths on the command line resolve against.
    pub cwd: PathBuf,

    /// The configuration and the file it came from.
    pub loaded: LoadedConfig,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// The configuration file is `--config`, else `$COROLLARY_CONFIG`, else
    /// the nearest `corollary.yaml` above the working directory.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("cannot determine the working directory")?;
        let env_path = env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let loaded = load_discovered(&cwd, global.config.as_deref(), env_path.as_deref())
            .context("failed to load configuration")?;
        if let Some(path) = &loaded.path {
            debug!(path = %path.display(), "loaded configuration");
        }

        Ok(Self {
            json: global.json,
            quiet: global.quiet,
            cwd,
            loaded,
        })
    }

    pub fn config(&self) -> &CorollaryConfig {
        &self.loaded.config
    }

    /// Names of the command sources to register: the command line's, else
    /// the configuration's.
    pub fn source_names<'a>(&'a self, args: &'a SourceArgs) -> &'a [String] {
        if args.sources.is_empty() {
            &self.config().command_sources
        } else {
            &args.sources
        }
    }

    /// Build a registry with the built-ins and the selected command sources.
    pub fn registry(&self, args: &SourceArgs) -> Result<Registry> {
        let mut registry = Registry::with_builtins()?;
        for name in self.source_names(args) {
            let source = command_source(name, self.config()).ok_or_else(|| {
                anyhow!(
                    "unknown command source \"{name}\" (available: {})",
                    SOURCE_NAMES.join(", ")
                )
            })?;
            registry
                .load_external(source.as_ref())
                .with_context(|| format!("failed to register command source \"{name}\""))?;
        }
        Ok(registry)
    }

    /// Locate the formula named on the command line.
    pub fn resolve_formula(&self, name: &str) -> Result<PathBuf> {
        Ok(find_formula(name, &self.cwd, &self.config().formula_dirs)?)
    }

    /// The target directory: `--target`, else the configured default.
    pub fn resolve_target(&self, flag: Option<&Path>) -> Result<PathBuf> {
        match flag {
            Some(path) if path.is_relative() => Ok(self.cwd.join(path)),
            Some(path) => Ok(path.to_path_buf()),
            None => match &self.config().target_directory {
                Some(path) => Ok(path.clone()),
                None => bail!(
                    "no target directory given (pass --target or set target-directory in corollary.yaml)"
                ),
            },
        }
    }
}
