//! Declarative schema validation over the value tree.
//!
//! Schemas are a JSON-Schema subset compiled once into a [`Schema`]. Validation never
//! stops at the first problem; callers pick fail-fast or collect-all via [`ValidationMode`].

pub mod meta;

use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Result, SkillError};
use crate::value::Value;

/// One step in the path from the instance root to a violating node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: Vec<PathSegment>,
    /// Keyword that failed, e.g. `required` or `type`.
    pub rule: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(path: Vec<PathSegment>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            path,
            rule,
            message: message.into(),
        }
    }

    /// JSON pointer of the violating node; the root renders as `/`.
    pub fn pointer(&self) -> String {
        if self.path.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for seg in &self.path {
            out.push('/');
            match seg {
                PathSegment::Index(i) => out.push_str(&i.to_string()),
                PathSegment::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
            }
        }
        out
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer(), self.message)
    }
}

/// Validation capability consumed by the registry and the executor.
pub trait Validator {
    /// All violations, sorted by path then message. Empty means valid.
    fn validate(&self, instance: &Value) -> Vec<Violation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Keep only the first violation.
    FailFast,
    CollectAll,
}

impl ValidationMode {
    pub fn apply(self, mut violations: Vec<Violation>) -> Vec<Violation> {
        if self == ValidationMode::FailFast {
            violations.truncate(1);
        }
        violations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeName {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl TypeName {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => TypeName::Null,
            "boolean" => TypeName::Boolean,
            "integer" => TypeName::Integer,
            "number" => TypeName::Number,
            "string" => TypeName::String,
            "array" => TypeName::Array,
            "object" => TypeName::Object,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            TypeName::Null => "null",
            TypeName::Boolean => "boolean",
            TypeName::Integer => "integer",
            TypeName::Number => "number",
            TypeName::String => "string",
            TypeName::Array => "array",
            TypeName::Object => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (TypeName::Null, Value::Null) => true,
            (TypeName::Boolean, Value::Bool(_)) => true,
            (TypeName::Integer, v) => v.as_i64().is_some(),
            (TypeName::Number, Value::Int(_) | Value::Float(_)) => true,
            (TypeName::String, Value::String(_)) => true,
            (TypeName::Array, Value::Sequence(_)) => true,
            (TypeName::Object, Value::Mapping(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
enum Additional {
    Allowed,
    Forbidden,
    Schema(Box<Node>),
}

#[derive(Debug, Clone)]
struct Node {
    /// `false` schema: rejects everything.
    reject_all: bool,
    types: Option<Vec<TypeName>>,
    required: Vec<String>,
    properties: Vec<(String, Node)>,
    additional: Additional,
    items: Option<Box<Node>>,
    enum_values: Option<Vec<Value>>,
    const_value: Option<Value>,
    pattern: Option<Regex>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl Node {
    fn accept_all() -> Self {
        Node {
            reject_all: false,
            types: None,
            required: Vec::new(),
            properties: Vec::new(),
            additional: Additional::Allowed,
            items: None,
            enum_values: None,
            const_value: None,
            pattern: None,
            min_length: None,
            max_length: None,
            min_items: None,
            max_items: None,
            minimum: None,
            maximum: None,
        }
    }
}

/// A compiled schema.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Node,
}

impl Schema {
    /// Compile a schema document. Malformed keywords fail here, not during validation.
    pub fn compile(document: &Value) -> Result<Self> {
        Ok(Schema {
            root: compile_node(document, "#")?,
        })
    }

    /// Load a JSON schema file and compile it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SkillError::io(format!("Failed to read schema {}", path.display()), e))?;
        let document = Value::from_json_str(&text).map_err(|source| SkillError::Json {
            location: path.display().to_string(),
            source,
        })?;
        if document.as_mapping().is_none() {
            return Err(SkillError::InvalidSchema {
                location: path.display().to_string(),
                message: "expected a JSON object".into(),
            });
        }
        Self::compile(&document).map_err(|e| match e {
            SkillError::InvalidSchema { location, message } => SkillError::InvalidSchema {
                location: format!("{} ({})", path.display(), location),
                message,
            },
            other => other,
        })
    }

    /// Validate and turn violations into a [`SkillError::SchemaViolation`].
    pub fn check(&self, instance: &Value, subject: &str, mode: ValidationMode) -> Result<()> {
        let violations = mode.apply(self.validate(instance));
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SkillError::SchemaViolation {
                subject: subject.to_string(),
                violations,
            })
        }
    }
}

impl Validator for Schema {
    fn validate(&self, instance: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        validate_node(&self.root, instance, &mut path, &mut out);
        out.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
        out
    }
}

fn invalid(location: &str, message: impl Into<String>) -> SkillError {
    SkillError::InvalidSchema {
        location: location.to_string(),
        message: message.into(),
    }
}

fn compile_node(doc: &Value, location: &str) -> Result<Node> {
    let map = match doc {
        Value::Bool(true) => return Ok(Node::accept_all()),
        Value::Bool(false) => {
            let mut node = Node::accept_all();
            node.reject_all = true;
            return Ok(node);
        }
        Value::Mapping(m) => m,
        other => {
            return Err(invalid(
                location,
                format!("schema must be an object or boolean, got {}", other.type_name()),
            ))
        }
    };

    let mut node = Node::accept_all();
    for (keyword, value) in map.iter() {
        let here = format!("{}/{}", location, keyword);
        match keyword.as_str() {
            "type" => node.types = Some(compile_types(value, &here)?),
            "required" => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| invalid(&here, "must be an array of strings"))?;
                node.required = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid(&here, "must be an array of strings"))
                    })
                    .collect::<Result<_>>()?;
            }
            "properties" => {
                let props = value
                    .as_mapping()
                    .ok_or_else(|| invalid(&here, "must be an object"))?;
                for (name, sub) in props.iter() {
                    let sub_loc = format!("{}/{}", here, name);
                    node.properties.push((name.clone(), compile_node(sub, &sub_loc)?));
                }
            }
            "additionalProperties" => {
                node.additional = match value {
                    Value::Bool(true) => Additional::Allowed,
                    Value::Bool(false) => Additional::Forbidden,
                    other => Additional::Schema(Box::new(compile_node(other, &here)?)),
                }
            }
            "items" => node.items = Some(Box::new(compile_node(value, &here)?)),
            "enum" => {
                let items = value
                    .as_sequence()
                    .ok_or_else(|| invalid(&here, "must be an array"))?;
                node.enum_values = Some(items.to_vec());
            }
            "const" => node.const_value = Some(value.clone()),
            "pattern" => {
                let source = value
                    .as_str()
                    .ok_or_else(|| invalid(&here, "must be a string"))?;
                let re = Regex::new(source)
                    .map_err(|e| invalid(&here, format!("invalid regular expression: {}", e)))?;
                node.pattern = Some(re);
            }
            "minLength" => node.min_length = Some(compile_count(value, &here)?),
            "maxLength" => node.max_length = Some(compile_count(value, &here)?),
            "minItems" => node.min_items = Some(compile_count(value, &here)?),
            "maxItems" => node.max_items = Some(compile_count(value, &here)?),
            "minimum" => node.minimum = Some(compile_number(value, &here)?),
            "maximum" => node.maximum = Some(compile_number(value, &here)?),
            _ => {}
        }
    }
    Ok(node)
}

fn compile_types(value: &Value, location: &str) -> Result<Vec<TypeName>> {
    let one = |v: &Value| -> Result<TypeName> {
        let name = v
            .as_str()
            .ok_or_else(|| invalid(location, "must be a type name or an array of type names"))?;
        TypeName::parse(name).ok_or_else(|| invalid(location, format!("unknown type '{}'", name)))
    };
    match value {
        Value::Sequence(items) if !items.is_empty() => items.iter().map(one).collect(),
        Value::Sequence(_) => Err(invalid(location, "type list must not be empty")),
        other => Ok(vec![one(other)?]),
    }
}

fn compile_count(value: &Value, location: &str) -> Result<usize> {
    value
        .as_i64()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| invalid(location, "must be a non-negative integer"))
}

fn compile_number(value: &Value, location: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid(location, "must be a number"))
}

/// JSON equality: numbers compare by value, mappings ignore key order.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equal(l, r))
        }
        (Value::Mapping(x), Value::Mapping(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|o| json_equal(v, o)))
        }
        _ => a == b,
    }
}

fn push(out: &mut Vec<Violation>, path: &[PathSegment], rule: &'static str, message: String) {
    out.push(Violation::new(path.to_vec(), rule, message));
}

fn validate_node(node: &Node, value: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Violation>) {
    if node.reject_all {
        push(out, path, "false", "no value is allowed here".into());
        return;
    }

    if let Some(types) = &node.types {
        if !types.iter().any(|t| t.matches(value)) {
            let expected: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            push(
                out,
                path,
                "type",
                format!("expected {}, got {}", expected.join(" or "), value.type_name()),
            );
            // Remaining keywords would only restate the type mismatch.
            return;
        }
    }

    if let Some(allowed) = &node.enum_values {
        if !allowed.iter().any(|a| json_equal(a, value)) {
            let listed: Vec<String> = allowed.iter().map(|a| a.to_json().to_string()).collect();
            push(
                out,
                path,
                "enum",
                format!("{} is not one of [{}]", value.to_json(), listed.join(", ")),
            );
        }
    }

    if let Some(expected) = &node.const_value {
        if !json_equal(expected, value) {
            push(out, path, "const", format!("expected constant {}", expected.to_json()));
        }
    }

    match value {
        Value::String(s) => validate_string(node, s, path, out),
        Value::Int(_) | Value::Float(_) => validate_number(node, value, path, out),
        Value::Sequence(items) => validate_array(node, items, path, out),
        Value::Mapping(_) => validate_object(node, value, path, out),
        _ => {}
    }
}

fn validate_string(node: &Node, s: &str, path: &[PathSegment], out: &mut Vec<Violation>) {
    let len = s.chars().count();
    if let Some(min) = node.min_length {
        if len < min {
            push(out, path, "minLength", format!("string shorter than {} characters", min));
        }
    }
    if let Some(max) = node.max_length {
        if len > max {
            push(out, path, "maxLength", format!("string longer than {} characters", max));
        }
    }
    if let Some(re) = &node.pattern {
        if !re.is_match(s) {
            push(out, path, "pattern", format!("'{}' does not match pattern '{}'", s, re.as_str()));
        }
    }
}

fn validate_number(node: &Node, value: &Value, path: &[PathSegment], out: &mut Vec<Violation>) {
    let Some(n) = value.as_f64() else { return };
    if let Some(min) = node.minimum {
        if n < min {
            push(out, path, "minimum", format!("{} is less than minimum {}", value.to_json(), min));
        }
    }
    if let Some(max) = node.maximum {
        if n > max {
            push(out, path, "maximum", format!("{} is greater than maximum {}", value.to_json(), max));
        }
    }
}

fn validate_array(
    node: &Node,
    items: &[Value],
    path: &mut Vec<PathSegment>,
    out: &mut Vec<Violation>,
) {
    if let Some(min) = node.min_items {
        if items.len() < min {
            push(out, path, "minItems", format!("expected at least {} items, got {}", min, items.len()));
        }
    }
    if let Some(max) = node.max_items {
        if items.len() > max {
            push(out, path, "maxItems", format!("expected at most {} items, got {}", max, items.len()));
        }
    }
    if let Some(item_schema) = &node.items {
        for (i, item) in items.iter().enumerate() {
            path.push(PathSegment::Index(i));
            validate_node(item_schema, item, path, out);
            path.pop();
        }
    }
}

fn validate_object(node: &Node, value: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Violation>) {
    let Some(map) = value.as_mapping() else { return };

    for key in &node.required {
        if !map.contains_key(key) {
            push(out, path, "required", format!("missing required key '{}'", key));
        }
    }

    for (key, child) in map.iter() {
        let declared = node.properties.iter().find(|(name, _)| name == key);
        let schema = match (declared, &node.additional) {
            (Some((_, s)), _) => s,
            (None, Additional::Allowed) => continue,
            (None, Additional::Forbidden) => {
                push(
                    out,
                    path,
                    "additionalProperties",
                    format!("unexpected key '{}'", key),
                );
                continue;
            }
            (None, Additional::Schema(s)) => s.as_ref(),
        };
        path.push(PathSegment::Key(key.clone()));
        validate_node(schema, child, path, out);
        path.pop();
    }
}
