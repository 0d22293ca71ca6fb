//! Throwaway repositories for command tests.

use std::fs;
use std::path::PathBuf;

use skillctl_core::skill::repo::RepoLayout;

pub const INPUT_SCHEMA: &str =
    r#"{"type":"object","required":["text"],"properties":{"text":{"type":"string"}}}"#;
pub const OUTPUT_SCHEMA: &str =
    r#"{"type":"object","required":["count"],"properties":{"count":{"type":"integer"}}}"#;

pub struct Fixture {
    _tmp: tempfile::TempDir,
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("skills")).unwrap();
        Self { _tmp: tmp, root }
    }

    pub fn layout(&self) -> RepoLayout {
        RepoLayout {
            root: self.root.clone(),
            skills_dir: self.root.join("skills"),
        }
    }

    /// A skill that echoes `{"count": 1}` after draining stdin.
    pub fn skill(&self, slug: &str, id: &str, version: &str) -> PathBuf {
        let dir = self.root.join("skills").join(slug);
        fs::create_dir_all(dir.join("schemas")).unwrap();
        fs::write(dir.join("schemas/input.schema.json"), INPUT_SCHEMA).unwrap();
        fs::write(dir.join("schemas/output.schema.json"), OUTPUT_SCHEMA).unwrap();
        let manifest = format!(
            "id: {id}\n\
             name: Test {id}\n\
             version: {version}\n\
             io:\n  inputSchema: schemas/input.schema.json\n  outputSchema: schemas/output.schema.json\n\
             runtime:\n  command:\n    - sh\n    - -c\n    - \"cat >/dev/null; echo '{{\\\"count\\\": 1}}'\"\n"
        );
        fs::write(dir.join("skill.yaml"), manifest).unwrap();
        dir
    }

    /// `skills/_template` with the directories scaffolding copies.
    pub fn template(&self) -> PathBuf {
        let dir = self.root.join("skills/_template");
        for sub in ["schemas", "impl", "fixtures", "tests"] {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }
        fs::write(dir.join("schemas/input.schema.json"), INPUT_SCHEMA).unwrap();
        fs::write(dir.join("schemas/output.schema.json"), OUTPUT_SCHEMA).unwrap();
        fs::write(
            dir.join("impl/run.sh"),
            "#!/bin/sh\ncat >/dev/null\necho '{\"count\": 0}'\n",
        )
        .unwrap();
        fs::create_dir_all(dir.join("fixtures/basic")).unwrap();
        fs::write(dir.join("fixtures/basic/input.json"), "{\"text\":\"\"}\n").unwrap();
        fs::write(dir.join("tests/smoke.sh"), "#!/bin/sh\nexit 0\n").unwrap();
        dir
    }
}
