//! `corollary check` -- validate a formula without executing any command.

use anyhow::Result;
use corollary_formula::engine;

use super::run::print_report;
use crate::cli::RunArgs;
use crate::context::RuntimeContext;

/// Execute the `corollary check` command.
pub fn run(ctx: &RuntimeContext, args: &RunArgs) -> Result<()> {
    let registry = ctx.registry(&args.sources)?;
    let formula = ctx.resolve_formula(&args.formula)?;
    let target = ctx.resolve_target(args.target.as_deref())?;

    let report = engine::check(&formula, &registry, &target)?;
    print_report(ctx, &report);
    Ok(())
}
