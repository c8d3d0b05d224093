//! Plan compilation.
//!
//! Turns the line-ordered entries of a [`Formula`] into an [`ExecutionPlan`]:
//! every command line is resolved against the [`Registry`], its arguments are
//! tokenized and counted, and the implicit scope entry/exit instructions of
//! `group` and `module` blocks are placed on the steps where they apply.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use corollary_core::builtin;
use corollary_core::{CommandScope, RegisteredCommand, Registry, RegistryError};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tracing::{debug, trace};

use crate::types::{Formula, FormulaEntry, FormulaError, Site, quote_list};

/// A scope control marker synthesized for `group`/`module` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Enter(CommandScope),
    Exit(CommandScope),
}

impl Instruction {
    pub fn scope(self) -> CommandScope {
        match self {
            Self::Enter(scope) | Self::Exit(scope) => scope,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scope, action) = match self {
            Self::Enter(scope) => (scope, "ENTRY"),
            Self::Exit(scope) => (scope, "EXIT"),
        };
        write!(f, "{} {action}", scope.as_str().to_uppercase())
    }
}

impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved command together with the raw argument tokens of its line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedInvocation {
    pub command: Arc<RegisteredCommand>,
    pub arguments: Vec<String>,
}

impl PlannedInvocation {
    pub fn name(&self) -> &str {
        self.command.name()
    }

    /// Pair the declared argument names with the tokens, in order.
    pub fn argument_map(&self) -> BTreeMap<String, String> {
        self.command
            .declaration()
            .argument_names()
            .zip(&self.arguments)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

impl Serialize for PlannedInvocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PlannedInvocation", 3)?;
        state.serialize_field("command", self.command.name())?;
        state.serialize_field("origin", &self.command.declaration().origin)?;
        state.serialize_field("arguments", &self.arguments)?;
        state.end()
    }
}

/// One line of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub line: usize,
    /// Applied before the command runs, in order.
    pub before: Vec<Instruction>,
    /// `None` for a step that only hosts instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<PlannedInvocation>,
    /// Applied after the command's variables are stored, in order.
    pub after: Vec<Instruction>,
}

impl Step {
    fn new(line: usize) -> Self {
        Self {
            line,
            before: Vec::new(),
            invocation: None,
            after: Vec::new(),
        }
    }

    /// Name of the step's command, or an empty string for an instruction-only
    /// step.
    pub fn command_name(&self) -> &str {
        self.invocation.as_ref().map_or("", PlannedInvocation::name)
    }
}

/// The compiled, immutable plan of a formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub source: String,
    pub steps: Vec<Step>,
}

impl ExecutionPlan {
    /// Compile `formula` against `registry`.
    ///
    /// # Errors
    ///
    /// Fails on the first line that cannot be tokenized, names an unknown
    /// command, passes the wrong number of arguments, or invokes a non-built-in
    /// command that provides a built-in variable.
    pub fn compile(formula: &Formula, registry: &Registry) -> Result<Self, FormulaError> {
        let reserved = registry.builtin_provided_variable_names();
        let mut steps: Vec<Step> = formula.entries.iter().map(|e| Step::new(e.line)).collect();

        for (index, entry) in formula.entries.iter().enumerate() {
            let (name, arguments) = split_invocation(&entry.text)
                .map_err(|message| FormulaError::parse(&formula.source, Some(entry.line), message))?;
            let site = || Site::new(&formula.source, entry.line, &name);

            let command = registry.resolve(&name).map_err(|e| match e {
                RegistryError::UnknownCommand(_) => FormulaError::UnknownCommand { site: site() },
                other => FormulaError::parse(&formula.source, Some(entry.line), other.to_string()),
            })?;

            let declaration = command.declaration();
            if arguments.len() != declaration.arguments.len() {
                return Err(FormulaError::ArgumentCount {
                    site: site(),
                    expected: declaration.arguments.len(),
                    got: arguments.len(),
                });
            }

            if !command.is_builtin() {
                let clashes: Vec<&str> = declaration
                    .provided_variable_names()
                    .filter(|v| reserved.contains(*v))
                    .collect();
                if !clashes.is_empty() {
                    return Err(FormulaError::ReservedVariable {
                        site: site(),
                        variables: quote_list(clashes),
                    });
                }
            }

            if let Some(scope) = builtin::block_scope(&name) {
                steps[index].before.push(Instruction::Enter(scope));
                place_exit(&mut steps, &formula.entries, index, scope);
            }

            trace!(line = entry.line, command = %name, ?arguments, "planned step");
            steps[index].invocation = Some(PlannedInvocation { command, arguments });
        }

        debug!(formula = %formula.source, steps = steps.len(), "compiled plan");
        Ok(Self {
            source: formula.source.clone(),
            steps,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The step compiled from `line`, if any.
    pub fn step(&self, line: usize) -> Option<&Step> {
        self.steps
            .binary_search_by_key(&line, |s| s.line)
            .ok()
            .map(|i| &self.steps[i])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Queue the exit of the block opened at `opener`.
///
/// The exit lands in front of the first later line at the same or a shallower
/// depth. A block that runs to the end of the formula closes after the last
/// step. Exits are prepended, so blocks closing together close innermost
/// first.
fn place_exit(steps: &mut [Step], entries: &[FormulaEntry], opener: usize, scope: CommandScope) {
    let depth = entries[opener].depth;
    let landing = entries
        .iter()
        .enumerate()
        .skip(opener + 1)
        .find(|(_, e)| e.depth <= depth)
        .map(|(i, _)| i);

    match landing {
        Some(index) => steps[index].before.insert(0, Instruction::Exit(scope)),
        None => {
            if let Some(last) = steps.last_mut() {
                last.after.insert(0, Instruction::Exit(scope));
            }
        }
    }
}

/// Split a command line into the command name and its shell-quoted arguments.
fn split_invocation(text: &str) -> Result<(String, Vec<String>), String> {
    let text = text.trim();
    let (name, rest) = match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], &text[at..]),
        None => (text, ""),
    };
    if name.is_empty() {
        return Err("empty command line".to_string());
    }
    let arguments = shlex::split(&escape_comment_marks(rest))
        .ok_or_else(|| format!("unbalanced quotes in \"{text}\""))?;
    Ok((name.to_string(), arguments))
}

/// Escape every `#` that starts an unquoted word.
///
/// `shlex` reads such a `#` as the start of a comment; in a command line it
/// is an ordinary character.
fn escape_comment_marks(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut after_backslash = false;
    let mut word_start = true;

    for c in text.chars() {
        let literal = after_backslash;
        after_backslash = false;
        match quote {
            Some(q) if c == q && !literal => quote = None,
            Some('"') if c == '\\' && !literal => after_backslash = true,
            Some(_) => {}
            None if literal => {}
            None if c == '\\' => after_backslash = true,
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '#' && word_start => escaped.push('\\'),
            None => {}
        }
        word_start = quote.is_none() && !literal && c.is_whitespace();
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_yaml;
    use corollary_core::{Argument, Command, CommandError, Invocation, Variable};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    struct Stub {
        name: &'static str,
        arguments: Vec<&'static str>,
        provides: Vec<&'static str>,
    }

    impl Command for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn arguments(&self) -> Vec<Argument> {
            self.arguments.iter().map(|a| Argument::new(*a)).collect()
        }

        fn provided_variables(&self) -> Vec<Variable> {
            self.provides.iter().map(|v| Variable::new(*v)).collect()
        }

        fn execute(&self, _invocation: &Invocation<'_>) -> Result<Value, CommandError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::with_builtins().unwrap();
        for (name, arguments, provides) in [
            ("some_command", vec!["value"], vec![]),
            ("noop", vec![], vec![]),
            ("pair", vec!["left", "right"], vec![]),
            ("sneaky", vec![], vec!["module"]),
        ] {
            registry
                .register_external(
                    "tests",
                    Arc::new(Stub {
                        name,
                        arguments,
                        provides,
                    }),
                )
                .unwrap();
        }
        registry
    }

    fn compile(yaml: &str) -> Result<ExecutionPlan, FormulaError> {
        let formula = parse_yaml(yaml, "test.yaml").unwrap();
        ExecutionPlan::compile(&formula, &registry())
    }

    fn outline(plan: &ExecutionPlan) -> Vec<String> {
        plan.steps()
            .iter()
            .map(|s| {
                let before: Vec<String> = s.before.iter().map(ToString::to_string).collect();
                let after: Vec<String> = s.after.iter().map(ToString::to_string).collect();
                format!(
                    "{} {:?} {} {:?}",
                    s.line,
                    before,
                    s.command_name(),
                    after
                )
            })
            .collect()
    }

    #[test]
    fn split_invocation_uses_shell_quoting() {
        assert_eq!(
            split_invocation("pair \"a b\" 'c'").unwrap(),
            ("pair".to_string(), vec!["a b".to_string(), "c".to_string()])
        );
        assert_eq!(split_invocation("  noop  ").unwrap(), ("noop".to_string(), vec![]));
        assert!(split_invocation("pair \"open").is_err());
        assert!(split_invocation("   ").is_err());
    }

    #[test]
    fn hash_marks_are_ordinary_characters() {
        assert_eq!(
            split_invocation("pair #a b").unwrap(),
            ("pair".to_string(), vec!["#a".to_string(), "b".to_string()])
        );
        assert_eq!(
            split_invocation("pair 'x #y' \"#z\" \\#w v#").unwrap().1,
            vec!["x #y", "#z", "#w", "v#"]
        );
    }

    #[test]
    fn hash_prefixed_arguments_are_counted() {
        let err = compile("- 'pair left right #note'\n").unwrap_err();
        assert!(matches!(
            err,
            FormulaError::ArgumentCount {
                expected: 2,
                got: 3,
                ..
            }
        ));
        let plan = compile("- 'pair left #right'\n").unwrap();
        let invocation = plan.steps()[0].invocation.as_ref().unwrap();
        assert_eq!(invocation.arguments, vec!["left", "#right"]);
    }

    #[test]
    fn module_block_to_end_of_formula() {
        let plan = compile("- module \"a\":\n  - some_command x\n").unwrap();
        assert_eq!(
            outline(&plan),
            vec![
                "1 [\"MODULE ENTRY\"] module []".to_string(),
                "2 [] some_command [\"MODULE EXIT\"]".to_string(),
            ]
        );
        let step = plan.step(1).unwrap();
        let invocation = step.invocation.as_ref().unwrap();
        assert_eq!(invocation.arguments, vec!["a"]);
        assert_eq!(
            invocation.argument_map(),
            BTreeMap::from([("moduleName".to_string(), "a".to_string())])
        );
    }

    #[test]
    fn lone_block_closes_on_its_own_line() {
        let plan = compile("- noop\n- group g:\n").unwrap();
        assert_eq!(
            outline(&plan),
            vec![
                "1 [] noop []".to_string(),
                "2 [\"GROUP ENTRY\"] group [\"GROUP EXIT\"]".to_string(),
            ]
        );
    }

    #[test]
    fn exit_lands_on_next_shallower_line() {
        let yaml = "\
- group first:
  - some_command a
- group second:
  - some_command b
- noop
";
        let plan = compile(yaml).unwrap();
        assert_eq!(
            outline(&plan),
            vec![
                "1 [\"GROUP ENTRY\"] group []".to_string(),
                "2 [] some_command []".to_string(),
                "3 [\"GROUP EXIT\", \"GROUP ENTRY\"] group []".to_string(),
                "4 [] some_command []".to_string(),
                "5 [\"GROUP EXIT\"] noop []".to_string(),
            ]
        );
    }

    #[test]
    fn nested_blocks_closing_together_close_innermost_first() {
        let yaml = "\
- group g:
  - module a:
    - some_command x
  - module b:
    - some_command y
- noop
";
        let plan = compile(yaml).unwrap();
        assert_eq!(
            outline(&plan),
            vec![
                "1 [\"GROUP ENTRY\"] group []".to_string(),
                "2 [\"MODULE ENTRY\"] module []".to_string(),
                "3 [] some_command []".to_string(),
                "4 [\"MODULE EXIT\", \"MODULE ENTRY\"] module []".to_string(),
                "5 [] some_command []".to_string(),
                "6 [\"MODULE EXIT\", \"GROUP EXIT\"] noop []".to_string(),
            ]
        );
    }

    #[test]
    fn nested_blocks_at_end_close_innermost_first() {
        let yaml = "\
- group g:
  - module a:
    - some_command x
";
        let plan = compile(yaml).unwrap();
        assert_eq!(
            plan.steps().last().unwrap().after,
            vec![
                Instruction::Exit(CommandScope::Module),
                Instruction::Exit(CommandScope::Group),
            ]
        );
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let yaml = "- group g:\n  - module a:\n    - pair 'x y' z\n- noop\n";
        assert_eq!(compile(yaml).unwrap(), compile(yaml).unwrap());
    }

    #[test]
    fn unknown_command() {
        let err = compile("- noop\n- frobnicate now\n").unwrap_err();
        match err {
            FormulaError::UnknownCommand { site } => {
                assert_eq!(site, Site::new("test.yaml", 2, "frobnicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn argument_count_must_match() {
        let err = compile("- pair one\n").unwrap_err();
        assert!(matches!(
            err,
            FormulaError::ArgumentCount {
                expected: 2,
                got: 1,
                ..
            }
        ));
        let err = compile("- module\n").unwrap_err();
        assert!(matches!(err, FormulaError::ArgumentCount { .. }));
    }

    #[test]
    fn external_command_cannot_provide_builtin_variable() {
        let err = compile("- sneaky\n").unwrap_err();
        match err {
            FormulaError::ReservedVariable { variables, .. } => assert_eq!(variables, "\"module\""),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unbalanced_quotes_are_a_parse_error() {
        let err = compile("- noop\n- pair \"a b\n").unwrap_err();
        assert!(matches!(err, FormulaError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn empty_formula_compiles_to_empty_plan() {
        let plan = compile("").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn plan_serializes_to_json() {
        let plan = compile("- module a:\n  - some_command 'x y'\n").unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["source"], "test.yaml");
        assert_eq!(json["steps"][0]["before"][0], "MODULE ENTRY");
        assert_eq!(json["steps"][0]["invocation"]["command"], "module");
        assert_eq!(json["steps"][0]["invocation"]["origin"], "builtin");
        assert_eq!(json["steps"][1]["invocation"]["arguments"][0], "x y");
        assert_eq!(json["steps"][1]["after"][0], "MODULE EXIT");
    }
}
