//! Skill registry: enumerate skill directories and resolve targets.
//!
//! Scan order is the byte order of directory names. Id lookups are order-dependent: when two
//! manifests declare the same id, the first directory in scan order wins and every shadowed
//! one is logged.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::manifest::read_manifest_value;
use super::repo::RepoLayout;
use super::{is_reserved_dir_name, MANIFEST_FILE_NAME};
use crate::error::{Result, SkillError};
use crate::value::Value;

/// Summary row for `list`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkillRef {
    pub id: String,
    pub version: String,
    pub name: String,
    /// Relative to the repo root when possible.
    pub path: String,
}

pub struct Registry {
    layout: RepoLayout,
}

fn scalar_text(manifest: &Value, key: &str) -> String {
    match manifest.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_json().to_string(),
    }
}

impl Registry {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Skill directories (those holding a manifest), sorted by name.
    /// Reserved `_*` directories are skipped unless `include_reserved`.
    pub fn skill_dirs(&self, include_reserved: bool) -> Result<Vec<PathBuf>> {
        let skills_dir = self.layout.require_skills_dir()?;
        let entries = fs::read_dir(skills_dir)
            .map_err(|e| SkillError::io(format!("Failed to read {}", skills_dir.display()), e))?;
        let mut children: Vec<_> = entries.flatten().collect();
        children.sort_by_key(|e| e.file_name());

        let mut out = Vec::new();
        for entry in children {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if !include_reserved && is_reserved_dir_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if path.join(MANIFEST_FILE_NAME).is_file() {
                out.push(path);
            }
        }
        Ok(out)
    }

    /// Identity of every non-reserved skill. Unparseable manifests are skipped with a warning.
    pub fn list(&self) -> Result<Vec<SkillRef>> {
        let mut out = Vec::new();
        for dir in self.skill_dirs(false)? {
            let manifest = match read_manifest_value(&dir) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable manifest");
                    continue;
                }
            };
            out.push(SkillRef {
                id: scalar_text(&manifest, "id"),
                version: scalar_text(&manifest, "version"),
                name: scalar_text(&manifest, "name"),
                path: self.layout.relative(&dir).display().to_string(),
            });
        }
        Ok(out)
    }

    /// Resolve a target to a skill directory.
    ///
    /// Targets containing `/` or starting with `.` are paths (relative to the repo root
    /// unless absolute). Anything else is an id looked up across non-reserved skills.
    pub fn resolve(&self, target: &str, allow_reserved: bool) -> Result<PathBuf> {
        if target.contains('/') || target.starts_with('.') {
            return self.resolve_path(target, allow_reserved);
        }
        self.resolve_id(target)
    }

    fn resolve_path(&self, target: &str, allow_reserved: bool) -> Result<PathBuf> {
        let candidate = Path::new(target);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.layout.root.join(candidate)
        };
        let dir = joined
            .canonicalize()
            .map_err(|_| SkillError::UnknownSkill(format!("{} (path not found)", target)))?;
        if !dir.join(MANIFEST_FILE_NAME).is_file() {
            return Err(SkillError::UnknownSkill(format!(
                "{} ({} not found under {})",
                target,
                MANIFEST_FILE_NAME,
                dir.display()
            )));
        }
        let reserved = dir
            .file_name()
            .is_some_and(|n| is_reserved_dir_name(&n.to_string_lossy()));
        if reserved && !allow_reserved {
            return Err(SkillError::UnknownSkill(format!(
                "{} (template/internal skills need --allow-template)",
                target
            )));
        }
        Ok(dir)
    }

    fn resolve_id(&self, id: &str) -> Result<PathBuf> {
        let mut found: Option<PathBuf> = None;
        for dir in self.skill_dirs(false)? {
            let manifest = match read_manifest_value(&dir) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable manifest during id lookup");
                    continue;
                }
            };
            if manifest.get("id").and_then(Value::as_str) != Some(id) {
                continue;
            }
            match &found {
                None => found = Some(dir),
                Some(winner) => tracing::warn!(
                    id,
                    winner = %self.layout.relative(winner).display(),
                    shadowed = %self.layout.relative(&dir).display(),
                    "Duplicate skill id; first directory in scan order wins"
                ),
            }
        }
        found.ok_or_else(|| SkillError::UnknownSkill(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(root: &Path, dir: &str, id: &str) {
        let d = root.join("skills").join(dir);
        fs::create_dir_all(&d).unwrap();
        fs::write(
            d.join(MANIFEST_FILE_NAME),
            format!("id: {id}\nname: {dir}\nversion: 0.1.0\n"),
        )
        .unwrap();
    }

    fn registry(root: &Path) -> Registry {
        Registry::new(RepoLayout {
            root: root.canonicalize().unwrap(),
            skills_dir: root.canonicalize().unwrap().join("skills"),
        })
    }

    #[test]
    fn test_list_sorted_and_skips_reserved() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "zeta", "z.skill");
        write_skill(tmp.path(), "alpha", "a.skill");
        write_skill(tmp.path(), "_template", "template.skill");
        fs::create_dir_all(tmp.path().join("skills/no-manifest")).unwrap();
        fs::write(tmp.path().join("skills/README.md"), "x").unwrap();

        let reg = registry(tmp.path());
        let listed = reg.list().unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a.skill", "z.skill"]);
        assert_eq!(listed[0].path, "skills/alpha");
        assert_eq!(listed[0].version, "0.1.0");

        assert_eq!(reg.skill_dirs(true).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_by_id_and_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "echo", "demo.echo");
        let reg = registry(tmp.path());

        let by_id = reg.resolve("demo.echo", false).unwrap();
        assert!(by_id.ends_with("skills/echo"));
        let by_path = reg.resolve("skills/echo", false).unwrap();
        assert_eq!(by_id, by_path);
        let by_dot = reg.resolve("./skills/echo", false).unwrap();
        assert_eq!(by_id, by_dot);
    }

    #[test]
    fn test_unknown_targets() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "echo", "demo.echo");
        let reg = registry(tmp.path());

        assert!(matches!(reg.resolve("demo.missing", false), Err(SkillError::UnknownSkill(_))));
        assert!(matches!(reg.resolve("skills/nope", false), Err(SkillError::UnknownSkill(_))));
        fs::create_dir_all(tmp.path().join("skills/empty")).unwrap();
        assert!(matches!(reg.resolve("skills/empty", false), Err(SkillError::UnknownSkill(_))));
    }

    #[test]
    fn test_duplicate_ids_first_in_scan_order_wins() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "b-copy", "dup.id");
        write_skill(tmp.path(), "a-original", "dup.id");
        let reg = registry(tmp.path());
        let resolved = reg.resolve("dup.id", false).unwrap();
        assert!(resolved.ends_with("skills/a-original"));
    }

    #[test]
    fn test_reserved_dirs_need_allowance() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "_template", "template.skill");
        let reg = registry(tmp.path());

        assert!(reg.resolve("skills/_template", false).is_err());
        assert!(reg.resolve("skills/_template", true).is_ok());
        // id lookup never considers reserved directories
        assert!(reg.resolve("template.skill", true).is_err());
    }

    #[test]
    fn test_unparseable_manifest_skipped_during_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let broken = tmp.path().join("skills/aaa-broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(MANIFEST_FILE_NAME), "id: x\n\tbad: tab\n").unwrap();
        write_skill(tmp.path(), "good", "demo.good");
        let reg = registry(tmp.path());

        assert!(reg.resolve("demo.good", false).is_ok());
        assert_eq!(reg.list().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_skills_dir_is_setup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(tmp.path());
        assert_eq!(reg.list().unwrap_err().exit_code(), 2);
    }
}
