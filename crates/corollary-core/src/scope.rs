//! Command scopes.
//!
//! Scopes form a strict total order from the widest (`Global`) to the
//! narrowest (`Module`). The derived `Ord` follows that order, so
//! `Global < Group < Module` reads as "less restrictive than".

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scope a formula line executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    /// Top level of a formula. Always at the base of the scope stack.
    #[default]
    Global,
    /// Inside a `group` block.
    Group,
    /// Inside a `module` block.
    Module,
}

impl CommandScope {
    /// All scopes, widest first.
    pub const ALL: [CommandScope; 3] = [Self::Global, Self::Group, Self::Module];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Group => "group",
            Self::Module => "module",
        }
    }

    /// Returns `true` if `self` is strictly less restrictive than `other`.
    pub fn is_wider_than(&self, other: CommandScope) -> bool {
        *self < other
    }

    /// Returns `true` if a command whose maximum scope is `self` may run while
    /// `current` is the active scope.
    ///
    /// A command may run at its maximum scope or any narrower one.
    pub fn permits(&self, current: CommandScope) -> bool {
        *self <= current
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_runs_from_widest_to_narrowest() {
        assert!(CommandScope::Global < CommandScope::Group);
        assert!(CommandScope::Group < CommandScope::Module);
        assert!(CommandScope::Global.is_wider_than(CommandScope::Module));
        assert!(!CommandScope::Module.is_wider_than(CommandScope::Module));
    }

    #[test]
    fn global_commands_run_anywhere() {
        for scope in CommandScope::ALL {
            assert!(CommandScope::Global.permits(scope));
        }
    }

    #[test]
    fn module_commands_need_a_module() {
        assert!(!CommandScope::Module.permits(CommandScope::Global));
        assert!(!CommandScope::Module.permits(CommandScope::Group));
        assert!(CommandScope::Module.permits(CommandScope::Module));
    }

    #[test]
    fn group_commands_rejected_at_global() {
        assert!(!CommandScope::Group.permits(CommandScope::Global));
        assert!(CommandScope::Group.permits(CommandScope::Module));
    }

    #[test]
    fn display_and_serde_are_lowercase() {
        assert_eq!(CommandScope::Module.to_string(), "module");
        let json = serde_json::to_string(&CommandScope::Group).unwrap();
        assert_eq!(json, "\"group\"");
        let parsed: CommandScope = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(parsed, CommandScope::Global);
    }
}
