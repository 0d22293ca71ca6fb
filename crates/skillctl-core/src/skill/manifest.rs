//! Typed view of `skill.yaml`.
//!
//! The raw value tree is kept alongside the typed fields so `describe --json` can show
//! declarations the executor does not interpret (governance, determinism, observability).

use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SkillError};
use crate::parser;
use crate::schema::{PathSegment, Violation};
use crate::value::Value;

pub const DEFAULT_CWD: &str = ".";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IoSpec {
    pub input_schema: String,
    pub output_schema: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    pub command: Vec<String>,
    pub cwd: String,
    pub timeout_ms: u64,
}

/// Declared access. Only the environment allow-list is enforced; the rest is advisory.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    /// `security.access.env.read`: names passed through to the child process.
    pub env_read: Vec<String>,
    pub network_allowed: bool,
    pub subprocess_allowed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub io: IoSpec,
    pub runtime: RuntimeSpec,
    pub security: SecuritySpec,
    #[serde(skip)]
    pub raw: Value,
}

/// Parse `skill.yaml` into a value tree without validating it.
pub fn read_manifest_value(skill_dir: &Path) -> Result<Value> {
    parser::parse_file(&skill_dir.join(super::MANIFEST_FILE_NAME))
}

struct Fields<'a> {
    raw: &'a Value,
    source: &'a str,
    problems: Vec<Violation>,
}

fn segments(dotted: &str) -> Vec<PathSegment> {
    if dotted.is_empty() {
        return Vec::new();
    }
    dotted
        .split('.')
        .map(|k| PathSegment::Key(k.to_string()))
        .collect()
}

impl<'a> Fields<'a> {
    fn problem(&mut self, dotted: &str, rule: &'static str, message: String) {
        self.problems.push(Violation::new(segments(dotted), rule, message));
    }

    fn required_str(&mut self, dotted: &str) -> String {
        let raw = self.raw;
        match raw.pointer(dotted) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) => {
                self.problem(dotted, "minLength", "must not be empty".into());
                String::new()
            }
            Some(other) => {
                self.problem(dotted, "type", format!("expected string, got {}", other.type_name()));
                String::new()
            }
            None => {
                self.problem(dotted, "required", format!("missing required key '{}'", dotted));
                String::new()
            }
        }
    }

    fn optional_str(&mut self, dotted: &str) -> Option<String> {
        let raw = self.raw;
        match raw.pointer(dotted) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.problem(dotted, "type", format!("expected string, got {}", other.type_name()));
                None
            }
        }
    }

    fn string_list(&mut self, dotted: &str) -> Option<Vec<String>> {
        let raw = self.raw;
        let items = match raw.pointer(dotted) {
            None | Some(Value::Null) => return None,
            Some(Value::Sequence(items)) => items,
            Some(other) => {
                self.problem(dotted, "type", format!("expected array, got {}", other.type_name()));
                return None;
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) => out.push(s.to_string()),
                None => self.problem(
                    &format!("{}.{}", dotted, i),
                    "type",
                    format!("expected string, got {}", item.type_name()),
                ),
            }
        }
        Some(out)
    }

    fn flag(&mut self, dotted: &str) -> bool {
        let raw = self.raw;
        match raw.pointer(dotted) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                self.problem(dotted, "type", format!("expected boolean, got {}", other.type_name()));
                false
            }
        }
    }

    fn timeout_ms(&mut self) -> u64 {
        let dotted = "runtime.timeoutMs";
        let raw = self.raw;
        match raw.pointer(dotted) {
            None | Some(Value::Null) => DEFAULT_TIMEOUT_MS,
            Some(v) => match v.as_i64().and_then(|i| u64::try_from(i).ok()) {
                Some(ms) if ms > 0 => ms,
                _ => {
                    self.problem(dotted, "minimum", "must be a positive integer".into());
                    DEFAULT_TIMEOUT_MS
                }
            },
        }
    }
}

impl Manifest {
    /// Normalize a (meta-validated) manifest tree into typed fields, applying defaults.
    ///
    /// Re-checks every field it reads, so a permissive repository meta-schema still cannot
    /// produce an unusable manifest.
    pub fn from_value(raw: Value, source: &str) -> Result<Self> {
        let mut f = Fields {
            raw: &raw,
            source,
            problems: Vec::new(),
        };
        if raw.as_mapping().is_none() {
            f.problem("", "type", format!("expected object, got {}", raw.type_name()));
        }

        let id = f.required_str("id");
        let name = f.required_str("name");
        let version = f.required_str("version");
        let description = f.optional_str("description");
        let io = IoSpec {
            input_schema: f.required_str("io.inputSchema"),
            output_schema: f.required_str("io.outputSchema"),
        };
        let command = match f.string_list("runtime.command") {
            Some(cmd) if !cmd.is_empty() => cmd,
            Some(_) => {
                f.problem("runtime.command", "minItems", "must not be empty".into());
                Vec::new()
            }
            None => {
                f.problem("runtime.command", "required", "missing required key 'runtime.command'".into());
                Vec::new()
            }
        };
        let runtime = RuntimeSpec {
            command,
            cwd: f.optional_str("runtime.cwd").unwrap_or_else(|| DEFAULT_CWD.to_string()),
            timeout_ms: f.timeout_ms(),
        };
        let security = SecuritySpec {
            env_read: f.string_list("security.access.env.read").unwrap_or_default(),
            network_allowed: f.flag("security.access.network.allowed"),
            subprocess_allowed: f.flag("security.access.subprocess.allowed"),
        };

        if !f.problems.is_empty() {
            let mut violations = std::mem::take(&mut f.problems);
            violations.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
            return Err(SkillError::SchemaViolation {
                subject: format!("Manifest {}", f.source),
                violations,
            });
        }

        Ok(Self {
            id,
            name,
            version,
            description,
            io,
            runtime,
            security,
            raw,
        })
    }
}
