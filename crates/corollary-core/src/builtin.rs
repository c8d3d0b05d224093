//! Built-in `group` and `module` commands.
//!
//! Both open a block that bounds variable visibility and publish the block's
//! name as a variable of the same name.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::command::{Argument, Command, Invocation, Variable};
use crate::error::CommandError;
use crate::scope::CommandScope;

/// Name of the built-in group command.
pub const GROUP: &str = "group";

/// Name of the built-in module command.
pub const MODULE: &str = "module";

/// Opens a `group` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupCommand;

impl Command for GroupCommand {
    fn name(&self) -> &str {
        GROUP
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::new("groupName")]
    }

    fn provided_variables(&self) -> Vec<Variable> {
        vec![Variable::new(GROUP)]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        Ok(json!({ GROUP: invocation.argument("groupName")? }))
    }
}

/// Opens a `module` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleCommand;

impl Command for ModuleCommand {
    fn name(&self) -> &str {
        MODULE
    }

    fn arguments(&self) -> Vec<Argument> {
        vec![Argument::new("moduleName")]
    }

    fn provided_variables(&self) -> Vec<Variable> {
        vec![Variable::new(MODULE)]
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        Ok(json!({ MODULE: invocation.argument("moduleName")? }))
    }
}

/// The built-in commands, in registration order.
pub fn commands() -> Vec<Arc<dyn Command>> {
    vec![Arc::new(GroupCommand), Arc::new(ModuleCommand)]
}

/// The scope a built-in command opens, if it opens one.
pub fn block_scope(name: &str) -> Option<CommandScope> {
    match name {
        GROUP => Some(CommandScope::Group),
        MODULE => Some(CommandScope::Module),
        _ => None,
    }
}
