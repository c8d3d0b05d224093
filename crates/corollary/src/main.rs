//! `corollary` -- run formulas of scoped commands.
//!
//! This is the entry point of the CLI. It parses arguments with clap, sets up
//! logging, resolves the runtime context, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use corollary_core::CommandError;
use corollary_formula::FormulaError;
use corollary_ui::styles::render_warn_icon;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, GlobalArgs};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Log filter for `--verbose` when `RUST_LOG` is unset.
const VERBOSE_FILTER: &str = "corollary=debug,corollary_core=debug,corollary_formula=debug,corollary_config=debug,corollary_commands=debug";

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(130);
    });

    let cli = Cli::parse();
    init_logging(&cli.global);

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| dispatch(&ctx, cli.command));

    if let Err(e) = result {
        // Declining to continue is a normal way to stop a run.
        if let Some(reason) = abort_reason(&e) {
            if cli.global.json {
                let json = serde_json::json!({ "aborted": reason });
                if let Ok(s) = serde_json::to_string_pretty(&json) {
                    eprintln!("{}", s);
                }
            } else if !cli.global.quiet {
                eprintln!("{} {:#}", render_warn_icon(), e);
            }
            return;
        }

        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(global: &GlobalArgs) {
    let default = if global.verbose {
        VERBOSE_FILTER
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Run(args)) => commands::run::run(ctx, &args),
        Some(Commands::Check(args)) => commands::check::run(ctx, &args),
        Some(Commands::Plan(args)) => commands::plan::run(ctx, &args),
        Some(Commands::Commands(args)) => commands::list::run(ctx, &args),
        Some(Commands::Version) => commands::version::run(ctx),
        None => {
            // No subcommand -- print help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}

/// The reason a command gave for stopping the run at the user's request.
fn abort_reason(error: &anyhow::Error) -> Option<&str> {
    match error.downcast_ref::<FormulaError>() {
        Some(FormulaError::Command {
            source: CommandError::Aborted(reason),
            ..
        }) => Some(reason),
        _ => None,
    }
}
