//! `corollary commands` -- list the registered commands and their contracts.

use anyhow::Result;
use corollary_core::{CommandDeclaration, Registry};
use corollary_ui::styles::render_category;

use crate::cli::SourceArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `corollary commands` command.
pub fn run(ctx: &RuntimeContext, args: &SourceArgs) -> Result<()> {
    let registry = ctx.registry(args)?;
    let declarations = declarations(&registry);

    if ctx.json {
        output_json(&declarations);
        return Ok(());
    }

    if !ctx.quiet {
        println!("{} ({})", render_category("commands"), declarations.len());
    }
    let rows: Vec<Vec<String>> = declarations.iter().copied().map(row).collect();
    output_table(
        &["NAME", "ORIGIN", "MAX SCOPE", "ARGUMENTS", "PROVIDES", "REQUIRES"],
        &rows,
    );
    Ok(())
}

/// Declarations in registration order.
fn declarations(registry: &Registry) -> Vec<&CommandDeclaration> {
    registry.commands().map(|c| c.declaration()).collect()
}

fn row(declaration: &CommandDeclaration) -> Vec<String> {
    vec![
        declaration.name.clone(),
        declaration.origin.clone(),
        declaration.maximum_scope.to_string(),
        join_or_dash(declaration.argument_names()),
        join_or_dash(declaration.provided_variable_names()),
        join_or_dash(declaration.required_variable_names.iter().map(String::as_str)),
    ]
}

fn join_or_dash<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() { "-".to_string() } else { joined }
}
