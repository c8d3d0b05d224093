//! Java properties files.
//!
//! Reading follows the usual `key=value` / `key: value` / `key value` forms
//! with `#`/`!` comments and backslash continuations. Updating rewrites single
//! `name = value` lines in place and leaves every other line untouched.

use std::collections::BTreeMap;

/// Parse properties text into a key → value map.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        properties.insert(unescape(key), unescape(value));
    }

    properties
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (at, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..at], line[at + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[at..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..at], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Replace the value of every `name = value` line with `value`.
///
/// Returns `None` if no line assigns `name`.
pub fn update_property(content: &str, name: &str, value: &str) -> Option<String> {
    let mut updated = String::with_capacity(content.len() + value.len());
    let mut found = false;

    for raw in content.split_inclusive('\n') {
        let (line, ending) = split_line_ending(raw);
        match value_start(line, name) {
            Some(start) => {
                found = true;
                updated.push_str(&line[..start]);
                updated.push_str(value);
            }
            None => updated.push_str(line),
        }
        updated.push_str(ending);
    }

    found.then_some(updated)
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

/// Byte offset of the value in a `name = value` line.
fn value_start(line: &str, name: &str) -> Option<usize> {
    let indent = line.len() - line.trim_start().len();
    let rest = line[indent..].strip_prefix(name)?;
    let after_name = rest.trim_start();
    let after_equals = after_name.strip_prefix('=')?;
    let value = after_equals.trim_start();
    Some(line.len() - value.len())
}
