//! Error kinds shared by every skillctl layer.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::Violation;

pub type Result<T> = std::result::Result<T, SkillError>;

#[derive(Debug, Error)]
pub enum SkillError {
    /// Malformed structured-config text. `line` is 1-based; 0 means the whole document.
    #[error("{}", format_parse_error(.source_name, .line, .message))]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    /// An instance failed a manifest or payload schema. The list is never truncated here;
    /// fail-fast callers trim it before constructing the error.
    #[error("{}", format_violations(.subject, .violations))]
    SchemaViolation {
        subject: String,
        violations: Vec<Violation>,
    },

    /// The schema itself is malformed (configuration error, not a validation outcome).
    #[error("Invalid schema {location}: {message}")]
    InvalidSchema { location: String, message: String },

    #[error("{rule}: {path} (base: {})", .base.display())]
    PathEscape {
        rule: &'static str,
        path: String,
        base: PathBuf,
    },

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    #[error("{0}")]
    Execution(String),

    /// Environment or setup problem (repo root, skills directory, template layout).
    #[error("{0}")]
    Setup(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON at {location}: {source}")]
    Json {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SkillError {
    /// Process exit code for this error: 2 for environment/setup errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            SkillError::Setup(_) => 2,
            _ => 1,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SkillError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        SkillError::Parse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}

fn format_parse_error(source_name: &str, line: &usize, message: &str) -> String {
    if *line == 0 {
        format!("Parse error in {}: {}", source_name, message)
    } else {
        format!("Parse error in {} at line {}: {}", source_name, line, message)
    }
}

fn format_violations(subject: &str, violations: &[Violation]) -> String {
    let mut out = format!("{} validation failed:", subject);
    for v in violations {
        out.push_str(&format!("\n- {}", v));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PathSegment;

    #[test]
    fn test_setup_errors_exit_with_two() {
        assert_eq!(SkillError::Setup("no repo".into()).exit_code(), 2);
        assert_eq!(SkillError::UnknownSkill("x".into()).exit_code(), 1);
        assert_eq!(SkillError::Execution("boom".into()).exit_code(), 1);
    }

    #[test]
    fn test_violation_error_lists_every_path() {
        let err = SkillError::SchemaViolation {
            subject: "Input".into(),
            violations: vec![
                Violation::new(vec![], "required", "missing required key 'a'"),
                Violation::new(
                    vec![PathSegment::Key("b".into()), PathSegment::Index(0)],
                    "type",
                    "expected string, got integer",
                ),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Input validation failed:"));
        assert!(text.contains("- /: missing required key 'a'"));
        assert!(text.contains("- /b/0: expected string, got integer"));
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = SkillError::parse("skill.yaml", 3, "Empty key");
        assert_eq!(err.to_string(), "Parse error in skill.yaml at line 3: Empty key");
    }
}
