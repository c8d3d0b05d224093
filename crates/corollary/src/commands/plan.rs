//! `corollary plan` -- print the compiled execution plan of a formula.

use anyhow::Result;
use corollary_formula::{ExecutionPlan, Instruction, engine};
use corollary_ui::styles::{render_in_scope, render_line_number};

use crate::cli::PlanArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `corollary plan` command.
pub fn run(ctx: &RuntimeContext, args: &PlanArgs) -> Result<()> {
    let registry = ctx.registry(&args.sources)?;
    let formula = ctx.resolve_formula(&args.formula)?;
    let plan = engine::compile_file(&formula, &registry)?;

    if ctx.json {
        output_json(&plan);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

/// One step per line: line number, entry instructions, the command with
/// its arguments, exit instructions.
fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    for step in plan.steps() {
        out.push_str(&render_line_number(step.line));
        for instruction in &step.before {
            out.push(' ');
            out.push_str(&render_instruction(*instruction));
        }
        if let Some(invocation) = &step.invocation {
            out.push(' ');
            out.push_str(invocation.name());
            for argument in &invocation.arguments {
                out.push_str(&format!(" {argument:?}"));
            }
        }
        for instruction in &step.after {
            out.push(' ');
            out.push_str(&render_instruction(*instruction));
        }
        out.push('\n');
    }
    out
}

fn render_instruction(instruction: Instruction) -> String {
    render_in_scope(&format!("[{instruction}]"), instruction.scope())
}
