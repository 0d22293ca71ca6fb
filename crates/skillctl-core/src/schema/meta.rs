//! Manifest meta-schema: built in, overridable per repository.

use std::path::{Path, PathBuf};

use super::Schema;
use crate::error::{Result, SkillError};
use crate::value::Value;

/// Built-in contract every `skill.yaml` must satisfy.
pub const BUILTIN_SKILL_SCHEMA: &str = include_str!("skill.schema.json");

/// Where a repository can place its own meta-schema, relative to the skills directory.
pub const OVERRIDE_RELATIVE_PATH: &str = "_schema/skill.schema.json";

pub fn override_path(skills_dir: &Path) -> PathBuf {
    skills_dir.join(OVERRIDE_RELATIVE_PATH)
}

/// Load the manifest meta-schema: the repository override when present, otherwise the
/// built-in one.
pub fn load_skill_schema(skills_dir: &Path) -> Result<Schema> {
    let path = override_path(skills_dir);
    if path.is_file() {
        tracing::debug!(path = %path.display(), "Using repository manifest schema");
        return Schema::from_file(&path);
    }
    builtin_skill_schema()
}

pub fn builtin_skill_schema() -> Result<Schema> {
    let document =
        Value::from_json_str(BUILTIN_SKILL_SCHEMA).map_err(|source| SkillError::Json {
            location: "built-in skill.schema.json".into(),
            source,
        })?;
    Schema::compile(&document)
}
