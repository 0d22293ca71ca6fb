//! A fully loaded skill: validated manifest plus compiled payload schemas.

use std::path::{Path, PathBuf};

use super::manifest::{read_manifest_value, Manifest};
use super::MANIFEST_FILE_NAME;
use crate::error::Result;
use crate::path_validation::safe_join;
use crate::schema::{Schema, ValidationMode};

pub struct SkillContract {
    pub dir: PathBuf,
    pub manifest: Manifest,
    /// `runtime.cwd` resolved under the skill directory.
    pub working_dir: PathBuf,
    pub input_schema_path: PathBuf,
    pub output_schema_path: PathBuf,
    pub input_schema: Schema,
    pub output_schema: Schema,
}

impl SkillContract {
    /// Parse, meta-validate and normalize the manifest, resolve the working directory, then
    /// resolve and compile both payload schemas. Any failing step fails the load; every
    /// command that needs a skill goes through here.
    pub fn load(dir: &Path, meta: &Schema, mode: ValidationMode) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        let source = manifest_path.display().to_string();

        let raw = read_manifest_value(dir)?;
        meta.check(&raw, &format!("Manifest {}", source), mode)?;
        let manifest = Manifest::from_value(raw, &source)?;

        let working_dir = safe_join(dir, &manifest.runtime.cwd)?;
        let input_schema_path = safe_join(dir, &manifest.io.input_schema)?;
        let output_schema_path = safe_join(dir, &manifest.io.output_schema)?;
        let input_schema = Schema::from_file(&input_schema_path)?;
        let output_schema = Schema::from_file(&output_schema_path)?;

        tracing::debug!(id = %manifest.id, dir = %dir.display(), "Loaded skill contract");
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            working_dir,
            input_schema_path,
            output_schema_path,
            input_schema,
            output_schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkillError;
    use crate::schema::meta::builtin_skill_schema;
    use crate::schema::Validator;
    use std::fs;

    fn write_contract(dir: &Path, manifest: &str) {
        fs::create_dir_all(dir.join("schemas")).unwrap();
        fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
        fs::write(
            dir.join("schemas/input.schema.json"),
            r#"{"type":"object","required":["text"],"properties":{"text":{"type":"string"}}}"#,
        )
        .unwrap();
        fs::write(
            dir.join("schemas/output.schema.json"),
            r#"{"type":"object","required":["count"],"properties":{"count":{"type":"integer"}}}"#,
        )
        .unwrap();
    }

    const MANIFEST: &str = "id: text.count\nname: Count\nversion: 0.1.0\nio:\n  inputSchema: schemas/input.schema.json\n  outputSchema: schemas/output.schema.json\nruntime:\n  command:\n    - sh\n    - impl/run.sh\n";

    fn load(dir: &Path) -> Result<SkillContract> {
        SkillContract::load(dir, &builtin_skill_schema().unwrap(), ValidationMode::CollectAll)
    }

    #[test]
    fn test_load_valid_contract() {
        let tmp = tempfile::tempdir().unwrap();
        write_contract(tmp.path(), MANIFEST);
        let c = load(tmp.path()).unwrap();
        assert_eq!(c.manifest.id, "text.count");
        assert!(c.input_schema_path.ends_with("schemas/input.schema.json"));
        let bad_input = crate::value::Value::from_json_str("{}").unwrap();
        assert_eq!(c.input_schema.validate(&bad_input).len(), 1);
        assert_eq!(c.working_dir, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_schema_path_escape_fails_load() {
        let tmp = tempfile::tempdir().unwrap();
        write_contract(
            tmp.path(),
            &MANIFEST.replace("schemas/output.schema.json", "../output.schema.json"),
        );
        assert!(matches!(load(tmp.path()), Err(SkillError::PathEscape { .. })));
    }

    #[test]
    fn test_meta_violation_fails_load() {
        let tmp = tempfile::tempdir().unwrap();
        write_contract(tmp.path(), &MANIFEST.replace("version: 0.1.0", "version: one"));
        match load(tmp.path()) {
            Err(SkillError::SchemaViolation { violations, .. }) => {
                assert_eq!(violations[0].pointer(), "/version")
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_schema_file_fails_load() {
        let tmp = tempfile::tempdir().unwrap();
        write_contract(tmp.path(), MANIFEST);
        fs::remove_file(tmp.path().join("schemas/input.schema.json")).unwrap();
        assert!(matches!(load(tmp.path()), Err(SkillError::Io { .. })));
    }

    #[test]
    fn test_cwd_escape_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write_contract(tmp.path(), &format!("{MANIFEST}  cwd: /tmp\n"));
        assert!(matches!(load(tmp.path()), Err(SkillError::PathEscape { .. })));
    }
}
