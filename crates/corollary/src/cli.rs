//! Clap CLI definitions for the `corollary` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// corollary -- run formulas of scoped commands.
///
/// A formula is a YAML document whose keys are command lines. Nested
/// `group` and `module` blocks open scopes that control which variables a
/// command can see.
#[derive(Parser, Debug)]
#[command(
    name = "corollary",
    about = "Run formulas of scoped commands",
    long_about = "A formula is a YAML document whose keys are command lines. Nested group and module blocks open scopes that control which variables a command can see.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: $COROLLARY_CONFIG, else corollary.yaml in
    /// the current directory or a parent).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a formula, then execute it.
    Run(RunArgs),

    /// Validate a formula without executing any command.
    Check(RunArgs),

    /// Print the compiled execution plan of a formula.
    Plan(PlanArgs),

    /// List the registered commands and their contracts.
    Commands(SourceArgs),

    /// Print version information.
    Version,
}

/// Command sources to register.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Command source to register (repeatable; default: command-sources from
    /// the configuration).
    #[arg(short = 'c', long = "command-source", value_name = "SOURCE")]
    pub sources: Vec<String>,
}

/// Arguments for `corollary run` and `corollary check`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Formula file or name (searched in the current directory and the
    /// configured formula directories).
    #[arg(short = 'f', long)]
    pub formula: String,

    /// Directory in whose context the formula runs (default:
    /// target-directory from the configuration).
    #[arg(short = 't', long = "target", value_name = "DIR")]
    pub target: Option<PathBuf>,

    #[command(flatten)]
    pub sources: SourceArgs,
}

/// Arguments for `corollary plan`.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Formula file or name.
    #[arg(short = 'f', long)]
    pub formula: String,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_repeated_sources() {
        let cli = Cli::try_parse_from([
            "corollary", "run", "-f", "release", "-t", "/tmp", "-c", "lemma", "-c", "lemma",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.formula, "release");
                assert_eq!(args.target, Some(PathBuf::from("/tmp")));
                assert_eq!(args.sources.sources, ["lemma", "lemma"]);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn formula_is_required() {
        assert!(Cli::try_parse_from(["corollary", "check"]).is_err());
    }
}
