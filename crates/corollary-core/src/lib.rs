//! Core types and traits for corollary.
//!
//! Contains the three-tier command scope model, the contract every command
//! implements, the built-in `group`/`module` commands and the registry that
//! resolves command names for the plan compiler.

pub mod builtin;
pub mod command;
pub mod error;
pub mod registry;
pub mod scope;

pub use command::{Argument, Command, CommandDeclaration, Invocation, Variable, Variables};
pub use error::{CommandError, RegistryError};
pub use registry::{CommandSource, RegisteredCommand, Registry};
pub use scope::CommandScope;
