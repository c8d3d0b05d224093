//! Error types for command registration and command execution.

use std::path::Path;

/// Errors raised while building the command registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A command declaration failed validation.
    #[error("error while registering command \"{name}\" ({origin}): {reason}")]
    InvalidDeclaration {
        /// The source that registered the command.
        origin: String,
        /// The command name as declared (may be empty).
        name: String,
        /// Why the declaration is invalid.
        reason: String,
    },

    /// An external command tried to use a built-in command's name.
    #[error("error while registering command \"{name}\" ({origin}): name is reserved for a built-in command")]
    NameReserved {
        /// The source that registered the command.
        origin: String,
        /// The reserved name.
        name: String,
    },

    /// Two commands share a name.
    #[error("error while registering command \"{name}\" ({origin}): duplicate command name (already registered by {existing})")]
    DuplicateName {
        /// The source that registered the command.
        origin: String,
        /// The duplicated name.
        name: String,
        /// The source of the command registered first.
        existing: String,
    },

    /// No command with this name is registered.
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),
}

impl RegistryError {
    /// Creates a [`RegistryError::InvalidDeclaration`].
    pub fn invalid_declaration(
        origin: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDeclaration {
            origin: origin.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors a command implementation may surface while executing.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The invocation carries no value for a declared argument.
    #[error("missing argument \"{0}\"")]
    MissingArgument(String),

    /// A variable the command reads is not visible in the current scope.
    #[error("variable \"{0}\" not found in scope")]
    MissingVariable(String),

    /// A value (argument, variable or user input) is unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// What the value was for.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A file could not be read, parsed or rewritten.
    #[error("file \"{path}\": {reason}")]
    File {
        /// The offending file.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// An external process failed.
    #[error("{program} failed (exit code {code:?}){}", log_hint(.log))]
    Process {
        /// The program that was run.
        program: String,
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        /// Where the process output was logged, if anywhere.
        log: Option<String>,
    },

    /// The user chose not to continue.
    #[error("aborted: {0}")]
    Aborted(String),
}

fn log_hint(log: &Option<String>) -> String {
    match log {
        Some(path) => format!("; output can be found in \"{path}\""),
        None => String::new(),
    }
}

impl CommandError {
    /// Creates a [`CommandError::InvalidValue`].
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`CommandError::File`] for the given path.
    pub fn file(path: &Path, reason: impl Into<String>) -> Self {
        Self::File {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
