//! The scope/variable machine.
//!
//! A plan is walked twice with the same algorithm: once by the
//! [`PlanIterator::Validator`], which checks scoping and variable availability
//! without running anything, and once by the [`PlanIterator::Executor`], which
//! runs every command and threads its variables through the scopes.
//!
//! ```text
//!   before-instructions (stack) -> observe scope -> before-instructions (variables)
//!     -> invoke command -> store variables -> after-instructions (stack, variables)
//! ```

use std::path::{Path, PathBuf};

use corollary_core::{CommandScope, Invocation, Registry, Variables};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::parser::load_formula;
use crate::plan::{ExecutionPlan, Instruction, PlannedInvocation, Step};
use crate::types::{FormulaError, Site, quote_list};

/// Where the machine currently is: formula, line and target directory.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub file: &'a str,
    pub line: usize,
    pub target_directory: &'a Path,
}

impl StepContext<'_> {
    pub fn site(&self, command: &str) -> Site {
        Site::new(self.file, self.line, command)
    }
}

/// Scope stack plus one variable map per scope tier.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeState {
    stack: Vec<CommandScope>,
    global: Variables,
    group: Variables,
    module: Variables,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeState {
    /// A fresh state: only the global scope, no variables.
    pub fn new() -> Self {
        Self {
            stack: vec![CommandScope::Global],
            global: Variables::new(),
            group: Variables::new(),
            module: Variables::new(),
        }
    }

    /// The innermost open scope.
    pub fn current(&self) -> CommandScope {
        self.stack.last().copied().unwrap_or(CommandScope::Global)
    }

    /// Open scopes, outermost first.
    pub fn stack(&self) -> &[CommandScope] {
        &self.stack
    }

    /// The variable map of one scope tier.
    pub fn variables(&self, scope: CommandScope) -> &Variables {
        match scope {
            CommandScope::Global => &self.global,
            CommandScope::Group => &self.group,
            CommandScope::Module => &self.module,
        }
    }

    fn variables_mut(&mut self, scope: CommandScope) -> &mut Variables {
        match scope {
            CommandScope::Global => &mut self.global,
            CommandScope::Group => &mut self.group,
            CommandScope::Module => &mut self.module,
        }
    }

    /// Variables visible in the current scope.
    pub fn visible(&self) -> &Variables {
        self.variables(self.current())
    }

    /// Apply the stack effect of `instruction`.
    pub fn apply_stack(&mut self, instruction: Instruction, site: impl FnOnce() -> Site) -> Result<(), FormulaError> {
        let current = self.current();
        match instruction {
            Instruction::Enter(scope) => {
                if !current.is_wider_than(scope) {
                    return Err(FormulaError::InvalidNesting {
                        site: site(),
                        entered: scope,
                        current,
                    });
                }
                self.stack.push(scope);
            }
            Instruction::Exit(scope) => {
                if current != scope || self.stack.len() < 2 {
                    return Err(FormulaError::UnbalancedScope {
                        site: site(),
                        exiting: scope,
                        current,
                    });
                }
                self.stack.pop();
            }
        }
        Ok(())
    }

    /// Apply the variable effect of `instruction`.
    ///
    /// Entering a group copies the global variables; entering a module copies
    /// the global variables a group does not shadow, then the group's. Exiting
    /// clears the exited scope.
    pub fn apply_variables(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Enter(CommandScope::Global) | Instruction::Exit(CommandScope::Global) => {}
            Instruction::Enter(CommandScope::Group) => {
                self.group = self.global.clone();
            }
            Instruction::Enter(CommandScope::Module) => {
                let mut module: Variables = self
                    .global
                    .iter()
                    .filter(|(name, _)| !self.group.contains_key(*name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                module.extend(self.group.iter().map(|(n, v)| (n.clone(), v.clone())));
                self.module = module;
            }
            Instruction::Exit(scope) => self.variables_mut(scope).clear(),
        }
    }

    /// Store variables in the current scope.
    pub fn publish(&mut self, values: Variables) {
        let scope = self.current();
        self.variables_mut(scope).extend(values);
    }

    fn apply_all(&mut self, instructions: &[Instruction], ctx: &StepContext<'_>, command: &str) -> Result<(), FormulaError> {
        for instruction in instructions {
            self.apply_stack(*instruction, || ctx.site(command))?;
        }
        for instruction in instructions {
            self.apply_variables(*instruction);
        }
        Ok(())
    }
}

/// The two passes over a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanIterator {
    /// Dry run: checks scopes and required variables, runs nothing.
    Validator,
    /// Runs every command.
    Executor,
}

impl PlanIterator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validator => "validate",
            Self::Executor => "execute",
        }
    }

    /// Check that the step's command may run in `current`.
    pub fn observe_scope(
        self,
        ctx: &StepContext<'_>,
        invocation: &PlannedInvocation,
        current: CommandScope,
    ) -> Result<(), FormulaError> {
        if self == Self::Executor {
            return Ok(());
        }
        let maximum = invocation.command.declaration().maximum_scope;
        if !maximum.permits(current) {
            return Err(FormulaError::ScopeViolation {
                site: ctx.site(invocation.name()),
                maximum,
                current,
            });
        }
        Ok(())
    }

    /// Invoke the step's command and return the variables it provides.
    pub fn invoke(
        self,
        ctx: &StepContext<'_>,
        invocation: &PlannedInvocation,
        state: &ScopeState,
    ) -> Result<Variables, FormulaError> {
        match self {
            Self::Validator => validate_invocation(ctx, invocation, state),
            Self::Executor => execute_invocation(ctx, invocation, state),
        }
    }
}

fn validate_invocation(
    ctx: &StepContext<'_>,
    invocation: &PlannedInvocation,
    state: &ScopeState,
) -> Result<Variables, FormulaError> {
    let declaration = invocation.command.declaration();
    let visible = state.visible();
    let missing: Vec<&str> = declaration
        .required_variable_names
        .iter()
        .map(String::as_str)
        .filter(|name| !visible.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        let visible = if visible.is_empty() {
            "none".to_string()
        } else {
            quote_list(visible.keys().map(String::as_str))
        };
        return Err(FormulaError::MissingVariable {
            site: ctx.site(invocation.name()),
            missing: quote_list(missing),
            scope: state.current(),
            visible,
        });
    }

    Ok(declaration
        .provided_variable_names()
        .map(|name| (name.to_string(), Value::Null))
        .collect())
}

fn execute_invocation(
    ctx: &StepContext<'_>,
    invocation: &PlannedInvocation,
    state: &ScopeState,
) -> Result<Variables, FormulaError> {
    let site = || ctx.site(invocation.name());
    let arguments = invocation.argument_map();
    let call = Invocation::new(invocation.name(), &arguments, state.visible(), ctx.target_directory);

    debug!(line = ctx.line, command = invocation.name(), ?arguments, "executing command");
    let returned = invocation
        .command
        .execute(&call)
        .map_err(|source| FormulaError::Command { site: site(), source })?;

    let values: Variables = match returned {
        Value::Null => Variables::new(),
        Value::Object(map) => map.into_iter().collect(),
        other => {
            return Err(FormulaError::NonMapReturn {
                site: site(),
                returned: describe(&other).to_string(),
            });
        }
    };

    let declaration = invocation.command.declaration();
    let undeclared: Vec<&str> = values
        .keys()
        .map(String::as_str)
        .filter(|name| !declaration.provides(name))
        .collect();
    if !undeclared.is_empty() {
        return Err(FormulaError::UndeclaredReturn {
            site: site(),
            variables: quote_list(undeclared),
        });
    }

    let missing: Vec<&str> = declaration
        .provided_variable_names()
        .filter(|name| !values.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(FormulaError::MissingReturnValue {
            site: site(),
            variables: quote_list(missing),
        });
    }

    Ok(values)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

fn run_step(
    iterator: PlanIterator,
    state: &mut ScopeState,
    step: &Step,
    ctx: &StepContext<'_>,
) -> Result<(), FormulaError> {
    let command = step.command_name();
    for instruction in &step.before {
        state.apply_stack(*instruction, || ctx.site(command))?;
    }
    if let Some(invocation) = &step.invocation {
        iterator.observe_scope(ctx, invocation, state.current())?;
    }
    for instruction in &step.before {
        state.apply_variables(*instruction);
    }

    if let Some(invocation) = &step.invocation {
        let values = iterator.invoke(ctx, invocation, state)?;
        state.publish(values);
    }

    state.apply_all(&step.after, ctx, command)
}

/// Walk `plan` once with `iterator`.
///
/// Returns the final scope state.
pub fn iterate(plan: &ExecutionPlan, iterator: PlanIterator, target_directory: &Path) -> Result<ScopeState, FormulaError> {
    info!(formula = %plan.source, pass = iterator.as_str(), steps = plan.len(), "iterating plan");
    let mut state = ScopeState::new();
    for step in plan.steps() {
        let ctx = StepContext {
            file: &plan.source,
            line: step.line,
            target_directory,
        };
        debug!(
            line = step.line,
            command = step.command_name(),
            scope = %state.current(),
            pass = iterator.as_str(),
            "step"
        );
        run_step(iterator, &mut state, step, &ctx)?;
    }
    Ok(state)
}

/// Dry-run `plan`, surfacing every scope and required-variable error.
pub fn validate(plan: &ExecutionPlan, target_directory: &Path) -> Result<ScopeState, FormulaError> {
    iterate(plan, PlanIterator::Validator, target_directory)
}

/// Run every command of `plan`.
pub fn execute(plan: &ExecutionPlan, target_directory: &Path) -> Result<ScopeState, FormulaError> {
    iterate(plan, PlanIterator::Executor, target_directory)
}

/// Check that `path` is an existing directory and canonicalize it.
pub fn prepare_target(path: &Path) -> Result<PathBuf, FormulaError> {
    if !path.is_dir() {
        return Err(FormulaError::TargetDirectory(path.display().to_string()));
    }
    path.canonicalize()
        .map_err(|_| FormulaError::TargetDirectory(path.display().to_string()))
}

/// Summary of a validated or executed formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub formula: String,
    pub target_directory: PathBuf,
    pub pass: PlanIterator,
    pub steps: usize,
    /// Number of command invocations in the plan.
    pub commands: usize,
    /// Global variables at the end of the pass.
    pub globals: Variables,
}

impl RunReport {
    fn new(plan: &ExecutionPlan, target_directory: PathBuf, pass: PlanIterator, state: ScopeState) -> Self {
        Self {
            formula: plan.source.clone(),
            target_directory,
            pass,
            steps: plan.len(),
            commands: plan.steps().iter().filter(|s| s.invocation.is_some()).count(),
            globals: state.global,
        }
    }
}

/// Load, compile and validate the formula at `formula_path`.
pub fn check(formula_path: &Path, registry: &Registry, target_directory: &Path) -> Result<RunReport, FormulaError> {
    let target = prepare_target(target_directory)?;
    let plan = compile_file(formula_path, registry)?;
    let state = validate(&plan, &target)?;
    info!(formula = %plan.source, "formula is valid");
    Ok(RunReport::new(&plan, target, PlanIterator::Validator, state))
}

/// Load, compile, validate and execute the formula at `formula_path`.
///
/// Nothing runs unless validation succeeds.
pub fn run(formula_path: &Path, registry: &Registry, target_directory: &Path) -> Result<RunReport, FormulaError> {
    let target = prepare_target(target_directory)?;
    let plan = compile_file(formula_path, registry)?;
    validate(&plan, &target)?;
    let state = execute(&plan, &target)?;
    info!(formula = %plan.source, target = %target.display(), "formula executed");
    Ok(RunReport::new(&plan, target, PlanIterator::Executor, state))
}

/// Load and compile the formula at `formula_path`.
pub fn compile_file(formula_path: &Path, registry: &Registry) -> Result<ExecutionPlan, FormulaError> {
    let formula = load_formula(formula_path)?;
    ExecutionPlan::compile(&formula, registry)
}
