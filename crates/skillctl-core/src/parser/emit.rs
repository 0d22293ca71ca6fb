//! Serializer for the restricted structured-config format.
//!
//! Output re-parses to an equivalent value tree. Strings that the parser would coerce are
//! written JSON-quoted. Empty containers and containers holding floats are written as JSON
//! flow literals, since the block syntax has no float scalar.

use super::is_integer_literal;
use crate::value::{Mapping, Value};

const INDENT_STEP: usize = 2;

/// Render a value tree as structured-config text. Top-level scalars are rendered inline.
pub fn to_config_string(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Mapping(m) if !m.is_empty() => emit_mapping(m, 0, &mut out),
        Value::Sequence(items) if !items.is_empty() => emit_sequence(items, 0, &mut out),
        other => {
            out.push_str(&inline(other).unwrap_or_else(|| flow(other)));
            out.push('\n');
        }
    }
    out
}

fn emit_mapping(map: &Mapping, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (key, value) in map.iter() {
        let key = render_key(key);
        match inline(value) {
            Some(text) => out.push_str(&format!("{pad}{key}: {text}\n")),
            None => {
                out.push_str(&format!("{pad}{key}:\n"));
                emit_block(value, indent + INDENT_STEP, out);
            }
        }
    }
}

fn emit_sequence(items: &[Value], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for item in items {
        match inline(item) {
            Some(text) => out.push_str(&format!("{pad}- {text}\n")),
            None => {
                out.push_str(&format!("{pad}-\n"));
                emit_block(item, indent + INDENT_STEP, out);
            }
        }
    }
}

fn emit_block(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Mapping(m) => emit_mapping(m, indent, out),
        Value::Sequence(items) => emit_sequence(items, indent, out),
        // inline() covers every scalar
        _ => {}
    }
}

/// Inline rendering, or `None` when the value needs a nested block.
fn inline(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(_) => Some(flow(value)),
        Value::String(s) => Some(render_string(s)),
        Value::Sequence(items) if items.is_empty() || contains_float(value) => Some(flow(value)),
        Value::Mapping(m) if m.is_empty() || contains_float(value) => Some(flow(value)),
        _ => None,
    }
}

fn flow(value: &Value) -> String {
    value.to_json().to_string()
}

fn contains_float(value: &Value) -> bool {
    match value {
        Value::Float(_) => true,
        Value::Sequence(items) => items.iter().any(contains_float),
        Value::Mapping(m) => m.iter().any(|(_, v)| contains_float(v)),
        _ => false,
    }
}

fn json_quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn render_string(s: &str) -> String {
    let lowered = s.to_ascii_lowercase();
    let needs_quotes = s.is_empty()
        || matches!(lowered.as_str(), "null" | "~" | "true" | "false")
        || is_integer_literal(s)
        || s.starts_with(['[', '{', '-'])
        || s.trim() != s
        || s.contains(['"', '\'', '#', ':'])
        || s.chars().any(char::is_control);
    if needs_quotes {
        json_quote(s)
    } else {
        s.to_string()
    }
}

fn render_key(key: &str) -> String {
    let needs_quotes = key.is_empty()
        || key.starts_with('-')
        || key.trim() != key
        || key.contains(['"', '\'', '#', ':'])
        || key.chars().any(char::is_control);
    if needs_quotes {
        json_quote(key)
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn reparse(text: &str) {
        let first = parse_str(text, "a.yaml").unwrap();
        let rendered = to_config_string(&first);
        let second = parse_str(&rendered, "b.yaml")
            .unwrap_or_else(|e| panic!("re-parse failed: {e}\n---\n{rendered}"));
        assert_eq!(first, second, "rendered:\n{rendered}");
    }

    #[test]
    fn test_reparse_is_equivalent() {
        reparse(
            "id: text.word_count\nname: Word count\nversion: 0.1.0\nruntime:\n  command:\n    - python3\n    - impl/run.py\n  timeoutMs: 500\n",
        );
        reparse("a:\nb:\n  -\n  - x\n  -\n    k: v\n");
        reparse("quoted: \"true\"\nnum_text: '42'\nhash: \"a # b\"\ncolon: \"x: y\"\nempty: \"\"\n");
        reparse("flow: [1.5, {\"k\": 2}]\nmap: {\"x\": 0.25}\nempty_list: []\n");
        reparse("\"odd:key\": 1\n\"-dash\": 2\n\"it's\": \"she said \\\"hi\\\"\"\n");
        reparse("- - nested dash text\n- \"  padded  \"\n- 'single'\n");
    }

    #[test]
    fn test_strings_that_coerce_are_quoted() {
        let mut m = Mapping::new();
        m.insert("a", Value::from("null"));
        m.insert("b", Value::from("12"));
        m.insert("c", Value::from("plain text"));
        let text = to_config_string(&Value::Mapping(m));
        assert_eq!(text, "a: \"null\"\nb: \"12\"\nc: plain text\n");
    }

    #[test]
    fn test_nested_block_layout() {
        let v = parse_str("outer:\n  list:\n    - 1\n    - two\n", "x").unwrap();
        assert_eq!(to_config_string(&v), "outer:\n  list:\n    - 1\n    - two\n");
    }

    #[test]
    fn test_empty_containers_are_flow() {
        let v = parse_str("m:\nl: []\n", "x").unwrap();
        assert_eq!(to_config_string(&v), "m: {}\nl: []\n");
    }
}
