//! The command contract.
//!
//! Every command, built-in or external, implements [`Command`]. The registry
//! captures the declaration parts of the trait (name, maximum scope,
//! arguments, provided and required variables) exactly once into an immutable
//! [`CommandDeclaration`]; plan steps then invoke the stateless implementation
//! through an [`Invocation`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{CommandError, RegistryError};
use crate::scope::CommandScope;

/// Variables visible in one scope, keyed by name.
pub type Variables = BTreeMap<String, Value>;

/// A named, positional command parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: String,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A variable a command promises to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A command implementation.
///
/// Implementations must be stateless: the same value serves every plan step
/// that invokes the command. Only `name` and `execute` are mandatory.
pub trait Command: Send + Sync {
    /// The name formulas use to invoke the command.
    fn name(&self) -> &str;

    /// The widest scope the command may run in.
    fn maximum_scope(&self) -> CommandScope {
        CommandScope::Global
    }

    /// Positional arguments, in the order formulas pass them.
    fn arguments(&self) -> Vec<Argument> {
        Vec::new()
    }

    /// Variables the command returns on success.
    fn provided_variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Variables that must be visible in the current scope before the
    /// command may run.
    fn required_variable_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run the command.
    ///
    /// Must return `null` when no variables are provided, or an object that
    /// holds exactly the declared provided variables.
    fn execute(&self, invocation: &Invocation<'_>) -> Result<Value, CommandError>;
}

/// The validated, immutable declaration of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDeclaration {
    pub name: String,
    pub maximum_scope: CommandScope,
    pub arguments: Vec<Argument>,
    pub provided_variables: Vec<Variable>,
    pub required_variable_names: Vec<String>,
    /// The command source that registered the command.
    pub origin: String,
}

impl CommandDeclaration {
    /// Capture and validate the declaration of `command`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidDeclaration`] if the command name, an
    /// argument name, a provided variable name or a required variable name
    /// is empty.
    pub fn capture(command: &dyn Command, origin: &str) -> Result<Self, RegistryError> {
        let name = command.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::invalid_declaration(
                origin,
                name,
                "command name must not be empty",
            ));
        }

        let arguments = command.arguments();
        if arguments.iter().any(|a| a.name.is_empty()) {
            return Err(RegistryError::invalid_declaration(
                origin,
                name,
                "argument names must not be empty",
            ));
        }

        let provided_variables = command.provided_variables();
        if provided_variables.iter().any(|v| v.name.is_empty()) {
            return Err(RegistryError::invalid_declaration(
                origin,
                name,
                "provided variable names must not be empty",
            ));
        }

        let required_variable_names = command.required_variable_names();
        if required_variable_names.iter().any(String::is_empty) {
            return Err(RegistryError::invalid_declaration(
                origin,
                name,
                "required variable names must not be empty",
            ));
        }

        Ok(Self {
            name,
            maximum_scope: command.maximum_scope(),
            arguments,
            provided_variables,
            required_variable_names,
            origin: origin.to_string(),
        })
    }

    /// Argument names in declaration order.
    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(|a| a.name.as_str())
    }

    /// Provided variable names in declaration order.
    pub fn provided_variable_names(&self) -> impl Iterator<Item = &str> {
        self.provided_variables.iter().map(|v| v.name.as_str())
    }

    /// Returns `true` if the command declares `name` as a provided variable.
    pub fn provides(&self, name: &str) -> bool {
        self.provided_variables.iter().any(|v| v.name == name)
    }
}

/// Everything a command sees while it executes.
///
/// Variables are a read-only view of the current scope; a command can only
/// influence later steps through its return value.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    command: &'a str,
    arguments: &'a BTreeMap<String, String>,
    variables: &'a Variables,
    target_directory: &'a Path,
}

impl<'a> Invocation<'a> {
    pub fn new(
        command: &'a str,
        arguments: &'a BTreeMap<String, String>,
        variables: &'a Variables,
        target_directory: &'a Path,
    ) -> Self {
        Self {
            command,
            arguments,
            variables,
            target_directory,
        }
    }

    /// Name of the invoked command.
    pub fn command(&self) -> &'a str {
        self.command
    }

    /// All argument values keyed by declared argument name.
    pub fn arguments(&self) -> &'a BTreeMap<String, String> {
        self.arguments
    }

    /// Value of the declared argument `name`.
    pub fn argument(&self, name: &str) -> Result<&'a str, CommandError> {
        self.arguments
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument(name.to_string()))
    }

    /// The current scope's variables.
    pub fn variables(&self) -> &'a Variables {
        self.variables
    }

    /// Value of a visible variable, if any.
    pub fn variable(&self, name: &str) -> Option<&'a Value> {
        self.variables.get(name)
    }

    /// Value of a visible variable rendered as text.
    ///
    /// Strings are returned verbatim, other values in their JSON form.
    pub fn variable_text(&self, name: &str) -> Result<String, CommandError> {
        match self.variable(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(CommandError::MissingVariable(name.to_string())),
        }
    }

    /// The directory the formula runs against.
    pub fn target_directory(&self) -> &'a Path {
        self.target_directory
    }

    /// Resolve `path` against the target directory unless it is absolute.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.target_directory.join(path)
        }
    }

    /// Directory of the module currently in scope (`<target>/<module>`).
    pub fn module_directory(&self) -> Result<PathBuf, CommandError> {
        let module = self.variable_text("module")?;
        Ok(self.target_directory.join(module))
    }
}
