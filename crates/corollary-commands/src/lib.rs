//! Command sources for corollary formulas.
//!
//! Sources are looked up by name, never discovered: a formula run registers
//! exactly the sources its configuration or command line names.

pub mod lemma;
pub mod manifest;
pub mod pom;
pub mod process;
pub mod prompt;
pub mod properties;

use std::sync::Arc;

use corollary_config::CorollaryConfig;
use corollary_core::CommandSource;

pub use lemma::LemmaSource;
pub use prompt::{Prompt, TerminalPrompt};

/// Names of every source this crate provides.
pub const SOURCE_NAMES: [&str; 1] = [lemma::SOURCE_NAME];

/// Build the command source called `name`, prompting on the terminal.
///
/// Returns `None` for an unknown name.
pub fn command_source(name: &str, config: &CorollaryConfig) -> Option<Box<dyn CommandSource>> {
    match name {
        lemma::SOURCE_NAME => Some(Box::new(LemmaSource::new(
            config.maven.clone(),
            Arc::new(TerminalPrompt),
        ))),
        _ => None,
    }
}
