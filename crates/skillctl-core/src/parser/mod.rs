//! Restricted indentation-based structured-config parser.
//!
//! Supports the subset manifests need: block mappings, block sequences, quoted and plain
//! scalars, and JSON flow literals. Indentation is spaces only.
//!
//! Empty values are asymmetric on purpose: `key:` with nothing nested yields an empty
//! mapping, a bare `-` with nothing nested yields null. Manifests in the wild rely on this.

mod emit;

pub use emit::to_config_string;

use std::fs;
use std::path::Path;

use crate::error::{Result, SkillError};
use crate::value::{Mapping, Value};

#[derive(Debug, Clone)]
struct Line {
    /// 1-based line number in the source text
    number: usize,
    indent: usize,
    text: String,
}

/// Parse a document from a file. The file path is used in error messages.
pub fn parse_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| SkillError::io(format!("Failed to read {}", path.display()), e))?;
    parse_str(&text, &path.display().to_string())
}

/// Parse a document from text. `source_name` only labels errors.
pub fn parse_str(text: &str, source_name: &str) -> Result<Value> {
    let lines = preprocess(text, source_name)?;
    let Some(first) = lines.first() else {
        return Err(SkillError::parse(source_name, 0, "Empty document"));
    };
    if first.indent != 0 {
        return Err(SkillError::parse(
            source_name,
            first.number,
            "Top-level block must start at indent 0",
        ));
    }

    let parser = Parser {
        lines: &lines,
        source_name,
    };
    let (value, next) = parser.block(0, 0, &[])?;
    if let Some(line) = lines.get(next) {
        return Err(parser.error(line, format!("Trailing content could not be parsed: {}", line.text)));
    }
    Ok(value)
}

fn preprocess(text: &str, source_name: &str) -> Result<Vec<Line>> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        if raw.contains('\t') {
            return Err(SkillError::parse(
                source_name,
                idx + 1,
                "Tabs are not allowed (use spaces)",
            ));
        }
        let line = strip_comment(raw).trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let content = line.trim_start_matches(' ');
        out.push(Line {
            number: idx + 1,
            indent: line.len() - content.len(),
            text: content.to_string(),
        });
    }
    Ok(out)
}

/// Tracks quote state while scanning a line. Backslash escapes are honoured only inside
/// double quotes; single-quoted text has no escapes (`''` toggles out and straight back in).
#[derive(Default)]
struct QuoteScanner {
    in_single: bool,
    in_double: bool,
    escaped: bool,
}

impl QuoteScanner {
    /// Feed one char; returns true when the char sits outside any quoted span.
    fn outside(&mut self, ch: char) -> bool {
        if self.in_double {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_double = false;
            }
            return false;
        }
        if self.in_single {
            if ch == '\'' {
                self.in_single = false;
            }
            return false;
        }
        match ch {
            '\'' => {
                self.in_single = true;
                false
            }
            '"' => {
                self.in_double = true;
                false
            }
            _ => true,
        }
    }
}

fn strip_comment(raw: &str) -> &str {
    if !raw.contains('#') {
        return raw;
    }
    let mut scanner = QuoteScanner::default();
    for (i, ch) in raw.char_indices() {
        if scanner.outside(ch) && ch == '#' {
            return &raw[..i];
        }
    }
    raw
}

/// Split `key: value` on the first `:`, skipping the key's own quotes when it starts quoted.
fn split_key(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with(['"', '\'']) {
        return text.split_once(':');
    }
    let mut scanner = QuoteScanner::default();
    for (i, ch) in text.char_indices() {
        if scanner.outside(ch) && ch == ':' {
            return Some((&text[..i], &text[i + 1..]));
        }
    }
    None
}

/// `- item` / bare `-` marker; returns the trimmed remainder.
fn sequence_item(text: &str) -> Option<&str> {
    if text == "-" {
        Some("")
    } else {
        text.strip_prefix("- ").map(str::trim)
    }
}

pub(crate) fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

struct Parser<'a> {
    lines: &'a [Line],
    source_name: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, line: &Line, message: impl Into<String>) -> SkillError {
        SkillError::parse(self.source_name, line.number, message)
    }

    /// Parse the block starting at `start`, whose first line is at `indent`.
    /// `open` holds the indents of every enclosing block.
    fn block(&self, start: usize, indent: usize, open: &[usize]) -> Result<(Value, usize)> {
        let first = &self.lines[start];
        if sequence_item(&first.text).is_some() {
            self.sequence(start, indent, open)
        } else {
            self.mapping(start, indent, open)
        }
    }

    /// Decide whether a line that left the current block closes it cleanly.
    fn check_dedent(&self, line: &Line, indent: usize, open: &[usize]) -> Result<()> {
        if line.indent > indent {
            return Err(self.error(line, format!("Unexpected indentation: {}", line.text)));
        }
        if !open.contains(&line.indent) {
            return Err(self.error(
                line,
                format!("Indentation does not match any open block: {}", line.text),
            ));
        }
        Ok(())
    }

    /// Nested block under an empty `key:` or `-`, if the next line is deeper.
    fn nested(&self, next: usize, indent: usize, open: &[usize]) -> Result<Option<(Value, usize)>> {
        match self.lines.get(next) {
            Some(line) if line.indent > indent => {
                let mut child_open = open.to_vec();
                child_open.push(indent);
                self.block(next, line.indent, &child_open).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn sequence(&self, start: usize, indent: usize, open: &[usize]) -> Result<(Value, usize)> {
        let mut items = Vec::new();
        let mut i = start;
        while let Some(line) = self.lines.get(i) {
            if line.indent != indent {
                self.check_dedent(line, indent, open)?;
                break;
            }
            let Some(rest) = sequence_item(&line.text) else {
                return Err(self.error(
                    line,
                    format!("Expected a sequence item ('- '), found: {}", line.text),
                ));
            };
            i += 1;
            if rest.is_empty() {
                match self.nested(i, indent, open)? {
                    Some((child, next)) => {
                        items.push(child);
                        i = next;
                    }
                    None => items.push(Value::Null),
                }
            } else {
                items.push(self.scalar(rest, line)?);
            }
        }
        Ok((Value::Sequence(items), i))
    }

    fn mapping(&self, start: usize, indent: usize, open: &[usize]) -> Result<(Value, usize)> {
        let mut map = Mapping::new();
        let mut i = start;
        while let Some(line) = self.lines.get(i) {
            if line.indent != indent {
                self.check_dedent(line, indent, open)?;
                break;
            }
            if sequence_item(&line.text).is_some() {
                return Err(self.error(
                    line,
                    format!("Sequence item where a mapping entry was expected: {}", line.text),
                ));
            }
            let Some((raw_key, rest)) = split_key(&line.text) else {
                return Err(self.error(
                    line,
                    format!("Invalid mapping entry (missing ':'): {}", line.text),
                ));
            };
            let raw_key = raw_key.trim();
            if raw_key.is_empty() {
                return Err(self.error(line, format!("Empty key in mapping entry: {}", line.text)));
            }
            let key = self.key(raw_key, line)?;
            let rest = rest.trim_start();
            i += 1;
            let value = if rest.is_empty() {
                match self.nested(i, indent, open)? {
                    Some((child, next)) => {
                        i = next;
                        child
                    }
                    None => Value::Mapping(Mapping::new()),
                }
            } else {
                self.scalar(rest, line)?
            };
            map.insert(key, value);
        }
        Ok((Value::Mapping(map), i))
    }

    fn key(&self, raw: &str, line: &Line) -> Result<String> {
        if is_quoted(raw, '"') || is_quoted(raw, '\'') {
            match self.scalar(raw, line)? {
                Value::String(s) if !s.is_empty() => Ok(s),
                _ => Err(self.error(line, format!("Empty key in mapping entry: {}", line.text))),
            }
        } else {
            Ok(raw.to_string())
        }
    }

    fn scalar(&self, text: &str, line: &Line) -> Result<Value> {
        match text.to_ascii_lowercase().as_str() {
            "null" | "~" => return Ok(Value::Null),
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            _ => {}
        }
        if text.starts_with('[') || text.starts_with('{') {
            return Value::from_json_str(text).map_err(|e| {
                self.error(line, format!("Unsupported flow value (must be JSON): {} ({})", text, e))
            });
        }
        if is_quoted(text, '"') {
            return serde_json::from_str::<String>(text)
                .map(Value::String)
                .map_err(|e| self.error(line, format!("Invalid quoted string: {} ({})", text, e)));
        }
        if is_quoted(text, '\'') {
            return Ok(Value::String(text[1..text.len() - 1].replace("''", "'")));
        }
        if is_integer_literal(text) {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Int(i));
            }
        }
        Ok(Value::String(text.to_string()))
    }
}

fn is_quoted(text: &str, quote: char) -> bool {
    text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote)
}
