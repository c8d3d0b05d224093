//! `corollary run` -- validate a formula, then execute it.

use anyhow::Result;
use corollary_formula::{PlanIterator, RunReport, engine};
use corollary_ui::styles::{render_accent, render_muted, render_pass_icon};
use serde_json::Value;

use crate::cli::RunArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `corollary run` command.
pub fn run(ctx: &RuntimeContext, args: &RunArgs) -> Result<()> {
    let registry = ctx.registry(&args.sources)?;
    let formula = ctx.resolve_formula(&args.formula)?;
    let target = ctx.resolve_target(args.target.as_deref())?;

    let report = engine::run(&formula, &registry, &target)?;
    print_report(ctx, &report);
    Ok(())
}

/// Print the outcome of a `run` or `check`.
pub(crate) fn print_report(ctx: &RuntimeContext, report: &RunReport) {
    if ctx.json {
        output_json(report);
        return;
    }
    if ctx.quiet {
        return;
    }

    let verb = match report.pass {
        PlanIterator::Validator => "Validated",
        PlanIterator::Executor => "Executed",
    };
    println!(
        "{} {verb} formula {} ({} commands) in {}",
        render_pass_icon(),
        render_accent(&report.formula),
        report.commands,
        report.target_directory.display()
    );
    // Validation only knows which globals get set, not their values.
    for (name, value) in &report.globals {
        match report.pass {
            PlanIterator::Validator => println!("  {}", render_muted(name)),
            PlanIterator::Executor => println!("  {} = {}", render_muted(name), display_value(value)),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
