//! Command registry.
//!
//! The registry owns every command a formula may invoke. Built-in commands are
//! registered first; external commands arrive through explicit
//! [`CommandSource`] registration, never through discovery.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::builtin;
use crate::command::{Command, CommandDeclaration, Invocation};
use crate::error::{CommandError, RegistryError};

/// Origin recorded for built-in commands.
pub const BUILTIN_ORIGIN: &str = "builtin";

/// A named, ordered export list of command implementations.
pub trait CommandSource {
    /// Name of the source, used as the origin of its commands.
    fn name(&self) -> &str;

    /// Commands exported by the source, in registration order.
    fn commands(&self) -> Vec<Arc<dyn Command>>;
}

/// A command known to the registry: its declaration plus its implementation.
#[derive(Clone)]
pub struct RegisteredCommand {
    declaration: CommandDeclaration,
    implementation: Arc<dyn Command>,
    builtin: bool,
}

impl RegisteredCommand {
    pub fn declaration(&self) -> &CommandDeclaration {
        &self.declaration
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Run the implementation.
    pub fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError> {
        self.implementation.execute(invocation)
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("declaration", &self.declaration)
            .field("builtin", &self.builtin)
            .finish()
    }
}

impl PartialEq for RegisteredCommand {
    fn eq(&self, other: &Self) -> bool {
        self.declaration == other.declaration && self.builtin == other.builtin
    }
}

/// Name → command lookup for the plan compiler.
#[derive(Debug, Default)]
pub struct Registry {
    /// Registration order.
    commands: Vec<Arc<RegisteredCommand>>,
    by_name: HashMap<String, Arc<RegisteredCommand>>,
}

impl Registry {
    /// An empty registry without built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `group` and `module` commands.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.load_builtins()?;
        Ok(registry)
    }

    /// Register the built-in commands.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the built-ins are already
    /// registered.
    pub fn load_builtins(&mut self) -> Result<(), RegistryError> {
        for command in builtin::commands() {
            let declaration = CommandDeclaration::capture(command.as_ref(), BUILTIN_ORIGIN)?;
            self.insert(declaration, command, true)?;
        }
        Ok(())
    }

    /// Register every command exported by `source`.
    ///
    /// Returns the number of commands registered.
    ///
    /// # Errors
    ///
    /// Fails on the first command whose declaration is invalid, whose name is
    /// reserved for a built-in, or whose name is already registered.
    pub fn load_external(&mut self, source: &dyn CommandSource) -> Result<usize, RegistryError> {
        let commands = source.commands();
        let count = commands.len();
        for command in commands {
            self.register_external(source.name(), command)?;
        }
        info!(source = source.name(), count, "loaded command source");
        Ok(count)
    }

    /// Register a single external command on behalf of `origin`.
    pub fn register_external(
        &mut self,
        origin: &str,
        command: Arc<dyn Command>,
    ) -> Result<(), RegistryError> {
        let declaration = CommandDeclaration::capture(command.as_ref(), origin)?;
        if self.is_builtin(&declaration.name) {
            return Err(RegistryError::NameReserved {
                origin: origin.to_string(),
                name: declaration.name,
            });
        }
        self.insert(declaration, command, false)
    }

    fn insert(
        &mut self,
        declaration: CommandDeclaration,
        implementation: Arc<dyn Command>,
        builtin: bool,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.by_name.get(&declaration.name) {
            return Err(RegistryError::DuplicateName {
                origin: declaration.origin.clone(),
                name: declaration.name.clone(),
                existing: existing.declaration.origin.clone(),
            });
        }

        debug!(command = %declaration.name, origin = %declaration.origin, builtin, "registered command");
        let registered = Arc::new(RegisteredCommand {
            declaration,
            implementation,
            builtin,
        });
        self.by_name
            .insert(registered.declaration.name.clone(), Arc::clone(&registered));
        self.commands.push(registered);
        Ok(())
    }

    /// Look up a command by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownCommand`] if no command has this name.
    pub fn resolve(&self, name: &str) -> Result<Arc<RegisteredCommand>, RegistryError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))
    }

    /// Returns `true` if `name` is a registered built-in command.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.by_name.get(name).is_some_and(|c| c.builtin)
    }

    /// Names of every variable any built-in command provides.
    ///
    /// External commands may not provide these.
    pub fn builtin_provided_variable_names(&self) -> BTreeSet<String> {
        self.commands
            .iter()
            .filter(|c| c.builtin)
            .flat_map(|c| c.declaration.provided_variable_names().map(str::to_string))
            .collect()
    }

    /// All commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<RegisteredCommand>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Variable;
    use crate::scope::CommandScope;
    use pretty_assertions::assert_eq;

    struct Named(&'static str);

    impl Command for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&self, _invocation: &Invocation<'_>) -> Result<Value, CommandError> {
            Ok(Value::Null)
        }
    }

    struct Source {
        name: &'static str,
        commands: Vec<&'static str>,
    }

    impl CommandSource for Source {
        fn name(&self) -> &str {
            self.name
        }

        fn commands(&self) -> Vec<Arc<dyn Command>> {
            self.commands
                .iter()
                .map(|n| Arc::new(Named(n)) as Arc<dyn Command>)
                .collect()
        }
    }

    #[test]
    fn builtins_are_group_and_module() {
        let registry = Registry::with_builtins().unwrap();
        let names: Vec<_> = registry.commands().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["group", "module"]);
        assert!(registry.is_builtin("group"));
        assert!(registry.is_builtin("module"));
        for command in registry.commands() {
            assert_eq!(command.declaration().maximum_scope, CommandScope::Global);
        }
    }

    #[test]
    fn builtin_provided_variables() {
        let registry = Registry::with_builtins().unwrap();
        let vars: Vec<_> = registry.builtin_provided_variable_names().into_iter().collect();
        assert_eq!(vars, vec!["group", "module"]);
    }

    #[test]
    fn loading_builtins_twice_fails() {
        let mut registry = Registry::with_builtins().unwrap();
        assert!(matches!(
            registry.load_builtins(),
            Err(RegistryError::DuplicateName { .. })
        ));
    }

    #[test]
    fn load_external_registers_in_order() {
        let mut registry = Registry::with_builtins().unwrap();
        let source = Source {
            name: "release",
            commands: vec!["tag", "publish"],
        };
        assert_eq!(registry.load_external(&source).unwrap(), 2);
        assert_eq!(registry.len(), 4);

        let tag = registry.resolve("tag").unwrap();
        assert!(!tag.is_builtin());
        assert_eq!(tag.declaration().origin, "release");
        assert!(!registry.is_builtin("tag"));
    }

    #[test]
    fn external_cannot_take_builtin_name() {
        let mut registry = Registry::with_builtins().unwrap();
        let source = Source {
            name: "bad",
            commands: vec!["module"],
        };
        let err = registry.load_external(&source).unwrap_err();
        assert!(matches!(err, RegistryError::NameReserved { ref name, .. } if name == "module"));
    }

    #[test]
    fn external_names_are_unique() {
        let mut registry = Registry::with_builtins().unwrap();
        registry
            .load_external(&Source {
                name: "first",
                commands: vec!["tag"],
            })
            .unwrap();
        let err = registry
            .load_external(&Source {
                name: "second",
                commands: vec!["tag"],
            })
            .unwrap_err();
        match err {
            RegistryError::DuplicateName {
                origin, existing, ..
            } => {
                assert_eq!(origin, "second");
                assert_eq!(existing, "first");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_external_name_is_invalid() {
        let mut registry = Registry::with_builtins().unwrap();
        let err = registry
            .register_external("tests", Arc::new(Named("")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDeclaration { .. }));
    }

    #[test]
    fn resolve_unknown_command() {
        let registry = Registry::with_builtins().unwrap();
        let err = registry.resolve("nope").unwrap_err();
        assert_eq!(err.to_string(), "unknown command \"nope\"");
    }

    #[test]
    fn external_variables_do_not_count_as_builtin() {
        struct Provider;
        impl Command for Provider {
            fn name(&self) -> &str {
                "provider"
            }
            fn provided_variables(&self) -> Vec<Variable> {
                vec![Variable::new("version")]
            }
            fn execute(&self, _invocation: &Invocation<'_>) -> Result<Value, CommandError> {
                Ok(Value::Null)
            }
        }

        let mut registry = Registry::with_builtins().unwrap();
        registry.register_external("tests", Arc::new(Provider)).unwrap();
        assert!(!registry.builtin_provided_variable_names().contains("version"));
    }
}
