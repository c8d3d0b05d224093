//! Formula data model and the errors raised while reading, compiling,
//! validating and executing formulas.

use std::fmt;

use corollary_core::{CommandError, CommandScope};
use serde::Serialize;

/// One command line of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaEntry {
    /// 1-based line number in the formula file. Unique per formula.
    pub line: usize,
    /// The command line text.
    pub text: String,
    /// Structural nesting depth (0 = top level).
    pub depth: usize,
}

/// A parsed formula: its entries sorted by line number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Formula {
    /// Where this formula was loaded from (set by the parser).
    pub source: String,

    /// Entries in increasing line order.
    pub entries: Vec<FormulaEntry>,
}

impl Formula {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where in a formula an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub file: String,
    pub line: usize,
    pub command: String,
}

impl Site {
    pub fn new(file: impl Into<String>, line: usize, command: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            command: command.into(),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} of formula \"{}\", command \"{}\"",
            self.line, self.file, self.command
        )
    }
}

/// Errors that can occur while reading, compiling, validating or executing a
/// formula.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    /// The formula document or a command line is malformed.
    #[error("{}formula \"{file}\": {message}", line_prefix(.line))]
    Parse {
        file: String,
        line: Option<usize>,
        message: String,
    },

    /// The formula file could not be read.
    #[error("could not read formula \"{file}\": {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// No formula with this name was found.
    #[error("formula \"{name}\" not found (searched {searched})")]
    NotFound { name: String, searched: String },

    /// The target directory does not exist.
    #[error("target directory \"{0}\" does not exist")]
    TargetDirectory(String),

    #[error("{site}: unknown command")]
    UnknownCommand { site: Site },

    #[error("{site}: takes {expected} argument(s), got {got}")]
    ArgumentCount {
        site: Site,
        expected: usize,
        got: usize,
    },

    /// A non-built-in command declares a variable reserved for built-ins.
    #[error("{site}: cannot provide built-in variable(s) {variables}")]
    ReservedVariable { site: Site, variables: String },

    /// A command runs in a scope wider than its maximum scope.
    #[error("{site}: maximum scope is \"{maximum}\", but the current scope is \"{current}\"")]
    ScopeViolation {
        site: Site,
        maximum: CommandScope,
        current: CommandScope,
    },

    /// A block is opened inside a scope that may not contain it.
    #[error("{site}: cannot open a {entered} block inside the {current} scope")]
    InvalidNesting {
        site: Site,
        entered: CommandScope,
        current: CommandScope,
    },

    /// An exit instruction does not match the innermost open scope.
    #[error("{site}: cannot leave the {exiting} scope while the {current} scope is innermost")]
    UnbalancedScope {
        site: Site,
        exiting: CommandScope,
        current: CommandScope,
    },

    /// Required variables are not visible in the current scope.
    #[error("{site}: requires variable(s) {missing}, but they are not visible in the {scope} scope (visible: {visible})")]
    MissingVariable {
        site: Site,
        missing: String,
        scope: CommandScope,
        visible: String,
    },

    /// A command returned something other than `null` or an object.
    #[error("{site}: expected provided variables as a map, but the command returned {returned}")]
    NonMapReturn { site: Site, returned: String },

    /// A command returned variables it did not declare.
    #[error("{site}: returned undeclared variable(s) {variables}")]
    UndeclaredReturn { site: Site, variables: String },

    /// A command did not return every variable it declared.
    #[error("{site}: promised to provide variable(s) {variables}, but failed to do so")]
    MissingReturnValue { site: Site, variables: String },

    /// The command itself failed.
    #[error("{site}: {source}")]
    Command {
        site: Site,
        #[source]
        source: CommandError,
    },
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("line {line} of "),
        None => String::new(),
    }
}

impl FormulaError {
    /// Creates a [`FormulaError::Parse`].
    pub fn parse(file: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// The formula line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => *line,
            _ => self.site().map(|s| s.line),
        }
    }

    /// The location the error refers to, for errors raised at a formula line.
    pub fn site(&self) -> Option<&Site> {
        match self {
            Self::UnknownCommand { site }
            | Self::ArgumentCount { site, .. }
            | Self::ReservedVariable { site, .. }
            | Self::ScopeViolation { site, .. }
            | Self::InvalidNesting { site, .. }
            | Self::UnbalancedScope { site, .. }
            | Self::MissingVariable { site, .. }
            | Self::NonMapReturn { site, .. }
            | Self::UndeclaredReturn { site, .. }
            | Self::MissingReturnValue { site, .. }
            | Self::Command { site, .. } => Some(site),
            Self::Parse { .. } | Self::Read { .. } | Self::NotFound { .. } | Self::TargetDirectory(_) => None,
        }
    }
}

/// Render names as a comma-separated list of quoted names.
pub(crate) fn quote_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
