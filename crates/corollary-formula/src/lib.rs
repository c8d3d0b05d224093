//! Formula engine for corollary.
//!
//! A formula is a YAML list of command lines, optionally nested inside
//! `group` and `module` blocks. This crate reads formulas with line tracking,
//! compiles them into an execution plan with implicit scope entry/exit
//! instructions, and walks the plan twice: once to validate scoping and
//! variable availability, once to execute the commands.

pub mod engine;
pub mod parser;
pub mod plan;
pub mod types;

pub use engine::{PlanIterator, RunReport, ScopeState, StepContext};
pub use parser::{find_formula, load_formula, parse_yaml};
pub use plan::{ExecutionPlan, Instruction, PlannedInvocation, Step};
pub use types::{Formula, FormulaEntry, FormulaError, Site};
