//! Read formula files and resolve formula paths.
//!
//! Formulas are YAML documents. The command lines are the scalars of a list;
//! a mapping entry's key is a command line and its value is the nested block
//! of that line (a list), one level deeper. The reader works on the YAML event
//! stream so that every command line keeps its source line number.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::types::{Formula, FormulaEntry, FormulaError};

/// A YAML node with the line it starts on.
#[derive(Debug)]
enum Node {
    Scalar { text: String, plain: bool, line: usize },
    Sequence { line: usize, items: Vec<Node> },
    Mapping { line: usize, pairs: Vec<(Node, Node)> },
    Alias { line: usize },
}

impl Node {
    fn line(&self) -> usize {
        match self {
            Node::Scalar { line, .. }
            | Node::Sequence { line, .. }
            | Node::Mapping { line, .. }
            | Node::Alias { line } => *line,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Node::Scalar { text, plain: true, .. } if is_null_text(text))
    }
}

fn is_null_text(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

/// A collection still receiving children.
enum Frame {
    Sequence {
        line: usize,
        items: Vec<Node>,
    },
    Mapping {
        line: usize,
        pairs: Vec<(Node, Node)>,
        key: Option<Node>,
    },
}

/// Builds a [`Node`] tree from parser events.
struct TreeBuilder {
    source: Vec<char>,
    stack: Vec<Frame>,
    documents: Vec<Node>,
}

impl TreeBuilder {
    fn new(content: &str) -> Self {
        Self {
            source: content.chars().collect(),
            stack: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Line of the last non-blank character before `mark`.
    ///
    /// Empty scalars and block scalars are marked at the token after their
    /// indicator; this walks back to the `-`, `:` or `>`/`|` they belong to.
    fn indicator_line(&self, mark: &Marker) -> usize {
        let end = mark.index().min(self.source.len());
        let mut line = mark.line();
        for c in self.source[..end].iter().rev() {
            if *c == '\n' {
                line = line.saturating_sub(1);
            } else if !c.is_whitespace() {
                return line;
            }
        }
        mark.line()
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { pairs, key, .. }) => match key.take() {
                Some(k) => pairs.push((k, node)),
                None => *key = Some(node),
            },
            None => self.documents.push(node),
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        match event {
            Event::Scalar(text, style, ..) => {
                let plain = matches!(style, TScalarStyle::Plain);
                let block = matches!(style, TScalarStyle::Literal | TScalarStyle::Folded);
                let line = if block || (plain && is_null_text(&text)) {
                    self.indicator_line(&mark)
                } else {
                    mark.line()
                };
                self.push(Node::Scalar { text, plain, line });
            }
            Event::SequenceStart(..) => self.stack.push(Frame::Sequence {
                line: mark.line(),
                items: Vec::new(),
            }),
            Event::MappingStart(..) => self.stack.push(Frame::Mapping {
                line: mark.line(),
                pairs: Vec::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => {
                let node = match self.stack.pop() {
                    Some(Frame::Sequence { line, items }) => Node::Sequence { line, items },
                    Some(Frame::Mapping { line, pairs, .. }) => Node::Mapping { line, pairs },
                    None => return,
                };
                self.push(node);
            }
            Event::Alias(..) => self.push(Node::Alias { line: mark.line() }),
            _ => {}
        }
    }
}

/// Flattens the node tree into line-keyed entries.
struct Unpacker<'a> {
    source: &'a str,
    entries: BTreeMap<usize, FormulaEntry>,
}

impl Unpacker<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> FormulaError {
        FormulaError::parse(self.source, Some(line), message)
    }

    fn record(&mut self, text: String, line: usize, depth: usize) -> Result<(), FormulaError> {
        if self.entries.contains_key(&line) {
            return Err(self.error(line, "only one command per line is allowed"));
        }
        self.entries.insert(line, FormulaEntry { line, text, depth });
        Ok(())
    }

    fn unpack_list(&mut self, items: Vec<Node>, depth: usize) -> Result<(), FormulaError> {
        for item in items {
            self.unpack_entry(item, depth)?;
        }
        Ok(())
    }

    fn unpack_entry(&mut self, node: Node, depth: usize) -> Result<(), FormulaError> {
        if node.is_null() {
            return Err(self.error(node.line(), "empty formula entry"));
        }
        match node {
            Node::Scalar { text, line, .. } => self.record(text, line, depth),
            Node::Mapping { pairs, .. } => {
                for (key, value) in pairs {
                    let Node::Scalar { text, line, .. } = key else {
                        return Err(self.error(key.line(), "command lines must be scalars"));
                    };
                    self.record(text, line, depth)?;
                    if value.is_null() {
                        continue;
                    }
                    match value {
                        Node::Sequence { items, .. } => self.unpack_list(items, depth + 1)?,
                        other => {
                            return Err(self.error(
                                other.line(),
                                "the block of a command line must be a list",
                            ));
                        }
                    }
                }
                Ok(())
            }
            Node::Sequence { line, .. } => Err(self.error(
                line,
                "unexpected nested list; nested blocks belong under a command line",
            )),
            Node::Alias { line } => Err(self.error(line, "YAML aliases are not supported")),
        }
    }
}

/// Parse a formula from a YAML string.
///
/// `source` names the formula in error messages and in the returned
/// [`Formula`].
pub fn parse_yaml(content: &str, source: &str) -> Result<Formula, FormulaError> {
    let mut builder = TreeBuilder::new(content);
    let mut parser = Parser::new(content.chars());
    parser
        .load(&mut builder, true)
        .map_err(|e| FormulaError::parse(source, Some(e.marker().line()), e.to_string()))?;

    let mut documents = builder.documents.into_iter();
    let root = documents.next();
    if let Some(extra) = documents.next() {
        return Err(FormulaError::parse(
            source,
            Some(extra.line()),
            "a formula must consist of a single YAML document",
        ));
    }

    let mut unpacker = Unpacker {
        source,
        entries: BTreeMap::new(),
    };
    match root {
        None => {}
        Some(node) if node.is_null() => {}
        Some(Node::Sequence { items, .. }) => unpacker.unpack_list(items, 0)?,
        Some(node @ Node::Mapping { .. }) => unpacker.unpack_entry(node, 0)?,
        Some(other) => {
            return Err(FormulaError::parse(
                source,
                Some(other.line()),
                "a formula must be a list of command lines",
            ));
        }
    }

    let entries: Vec<FormulaEntry> = unpacker.entries.into_values().collect();
    debug!(formula = source, entries = entries.len(), "parsed formula");
    Ok(Formula {
        source: source.to_string(),
        entries,
    })
}

/// Load a formula from a file path.
pub fn load_formula(path: &Path) -> Result<Formula, FormulaError> {
    let source = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| FormulaError::Read {
        file: source.clone(),
        source: e,
    })?;
    parse_yaml(&content, &source)
}

/// Standard suffixes tried when a formula is referenced by name.
const SUFFIXES: [&str; 3] = [".formula.yaml", ".yaml", ".yml"];

/// Search for a formula by name.
///
/// Search order:
/// 1. Exact path (absolute, or relative to `cwd`)
/// 2. `cwd` with standard suffixes
/// 3. Each of `search_dirs` (relative ones resolved against `cwd`) with the
///    bare name and the standard suffixes
pub fn find_formula(name: &str, cwd: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf, FormulaError> {
    // 1. Exact path
    let exact = Path::new(name);
    if exact.is_absolute() && exact.is_file() {
        return Ok(exact.to_path_buf());
    }
    let relative = cwd.join(name);
    if relative.is_file() {
        return Ok(relative);
    }

    // 2. Current directory
    for suffix in &SUFFIXES {
        let candidate = cwd.join(format!("{name}{suffix}"));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    // 3. Configured formula directories
    for dir in search_dirs {
        let dir = cwd.join(dir);
        if !dir.is_dir() {
            continue;
        }
        let bare = dir.join(name);
        if bare.is_file() {
            return Ok(bare);
        }
        for suffix in &SUFFIXES {
            let candidate = dir.join(format!("{name}{suffix}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    let mut searched = vec![cwd.display().to_string()];
    searched.extend(search_dirs.iter().map(|d| d.display().to_string()));
    Err(FormulaError::NotFound {
        name: name.to_string(),
        searched: searched.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(yaml: &str) -> Vec<(usize, String, usize)> {
        parse_yaml(yaml, "test.yaml")
            .unwrap()
            .entries
            .into_iter()
            .map(|e| (e.line, e.text, e.depth))
            .collect()
    }

    #[test]
    fn flat_list() {
        let yaml = "- ask_for_version\n- delete_file build.log\n";
        assert_eq!(
            entries(yaml),
            vec![
                (1, "ask_for_version".to_string(), 0),
                (2, "delete_file build.log".to_string(), 0),
            ]
        );
    }

    #[test]
    fn nested_blocks_record_depth() {
        let yaml = "\
- read_version_from version.properties
- group core:
  - module \"a\":
    - osgi_update_bundle_version
  - module b:
    - mvn_tycho_set_version
- delete_file x
";
        assert_eq!(
            entries(yaml),
            vec![
                (1, "read_version_from version.properties".to_string(), 0),
                (2, "group core".to_string(), 0),
                (3, "module \"a\"".to_string(), 1),
                (4, "osgi_update_bundle_version".to_string(), 2),
                (5, "module b".to_string(), 1),
                (6, "mvn_tycho_set_version".to_string(), 2),
                (7, "delete_file x".to_string(), 0),
            ]
        );
    }

    #[test]
    fn entries_are_sorted_by_line() {
        // Deeper blocks are unpacked before later siblings; the result is
        // still in line order.
        let yaml = "\
- group g:
  - module m:
    - a
  - b
- c
";
        let lines: Vec<usize> = entries(yaml).into_iter().map(|e| e.0).collect();
        assert_eq!(lines, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn comments_and_blank_lines_keep_source_lines() {
        let yaml = "# release formula\n\n- ask_for_version\n\n- ask_for_snapshot\n";
        let lines: Vec<usize> = entries(yaml).into_iter().map(|e| e.0).collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn block_without_body_is_allowed() {
        let yaml = "- group empty:\n- a\n";
        assert_eq!(
            entries(yaml),
            vec![(1, "group empty".to_string(), 0), (2, "a".to_string(), 0)]
        );
    }

    #[test]
    fn empty_entry_names_its_own_line() {
        let err = parse_yaml("- a\n-\n- b\n", "gap.yaml").unwrap_err();
        assert!(matches!(err, FormulaError::Parse { line: Some(2), .. }), "{err}");
        assert!(err.to_string().contains("empty formula entry"));
    }

    #[test]
    fn block_scalar_entry_starts_at_indicator() {
        let formula = parse_yaml("- noop\n- >\n  pair a\n  b\n", "folded.yaml").unwrap();
        let lines: Vec<usize> = formula.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(formula.entries[1].text.trim_end(), "pair a b");
    }

    #[test]
    fn empty_document_is_empty_formula() {
        let formula = parse_yaml("", "empty.yaml").unwrap();
        assert!(formula.is_empty());
        let formula = parse_yaml("# nothing\n", "empty.yaml").unwrap();
        assert!(formula.is_empty());
    }

    #[test]
    fn top_level_mapping_is_single_entry() {
        let yaml = "module a:\n  - b\n";
        assert_eq!(
            entries(yaml),
            vec![(1, "module a".to_string(), 0), (2, "b".to_string(), 1)]
        );
    }

    #[test]
    fn nested_list_is_rejected() {
        let yaml = "- a\n- - b\n";
        let err = parse_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, FormulaError::Parse { line: Some(2), .. }), "{err}");
    }

    #[test]
    fn scalar_block_is_rejected() {
        let yaml = "- group g: nope\n";
        let err = parse_yaml(yaml, "bad.yaml").unwrap_err();
        assert!(err.to_string().contains("must be a list"), "{err}");
    }

    #[test]
    fn two_commands_on_one_line_are_rejected() {
        let yaml = "- [a, b]\n";
        assert!(parse_yaml(yaml, "bad.yaml").is_err());
    }

    #[test]
    fn scalar_document_is_rejected() {
        let err = parse_yaml("just a string\n", "bad.yaml").unwrap_err();
        assert!(err.to_string().contains("list of command lines"), "{err}");
    }

    #[test]
    fn syntax_error_reports_file() {
        let err = parse_yaml("- a\n- \"unterminated\n", "broken.yaml").unwrap_err();
        match err {
            FormulaError::Parse { file, line, .. } => {
                assert_eq!(file, "broken.yaml");
                assert!(line.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_formula_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.yaml");
        std::fs::write(&path, "- a\n").unwrap();
        let formula = load_formula(&path).unwrap();
        assert_eq!(formula.source, path.display().to_string());
        assert_eq!(formula.len(), 1);
    }

    #[test]
    fn load_missing_formula_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_formula(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, FormulaError::Read { .. }));
    }

    #[test]
    fn find_formula_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let formulas = dir.path().join("formulas");
        std::fs::create_dir(&formulas).unwrap();
        std::fs::write(formulas.join("release.yaml"), "- a\n").unwrap();
        std::fs::write(dir.path().join("local.formula.yaml"), "- a\n").unwrap();

        let found = find_formula("local", dir.path(), &[]).unwrap();
        assert_eq!(found, dir.path().join("local.formula.yaml"));

        let found = find_formula("release", dir.path(), &[PathBuf::from("formulas")]).unwrap();
        assert_eq!(found, formulas.join("release.yaml"));

        let err = find_formula("missing", dir.path(), &[PathBuf::from("formulas")]).unwrap_err();
        assert!(matches!(err, FormulaError::NotFound { .. }));
    }
}
