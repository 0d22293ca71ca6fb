//! Path validation utilities.
//!
//! Resolves manifest-declared relative paths against a skill directory, rejecting anything
//! that could leave it.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SkillError};

pub const RULE_ABSOLUTE: &str = "Absolute paths are not allowed";
pub const RULE_PARENT: &str = "Parent path segments are not allowed";
pub const RULE_ESCAPE: &str = "Path escapes base directory";

fn escape(rule: &'static str, declared: &str, base: &Path) -> SkillError {
    SkillError::PathEscape {
        rule,
        path: declared.to_string(),
        base: base.to_path_buf(),
    }
}

/// Join `declared` onto `base` and return the resolved path.
///
/// Absolute paths and any `..` segment are rejected before touching the filesystem.
/// The deepest existing ancestor of the result is canonicalized (so symlinks along the
/// path are followed) and the whole path must equal `base` or lie beneath it.
pub fn safe_join(base: &Path, declared: &str) -> Result<PathBuf> {
    let rel = Path::new(declared);
    if rel.is_absolute() || declared.starts_with('/') || declared.starts_with('\\') {
        return Err(escape(RULE_ABSOLUTE, declared, base));
    }
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return Err(escape(RULE_PARENT, declared, base));
    }

    let base_resolved = base
        .canonicalize()
        .map_err(|e| SkillError::io(format!("Invalid base directory {}", base.display()), e))?;
    let candidate = resolve_existing_prefix(&base_resolved.join(rel))?;

    if !candidate.starts_with(&base_resolved) {
        return Err(escape(RULE_ESCAPE, declared, base));
    }
    Ok(candidate)
}

/// Canonicalize the longest existing prefix of `path` and re-append the missing tail.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut tail = Vec::new();
    let mut current = path;
    loop {
        // symlink_metadata so a dangling link still counts as existing and fails to resolve
        if current.symlink_metadata().is_ok() {
            let mut resolved = current.canonicalize().map_err(|e| {
                SkillError::io(format!("Failed to resolve {}", current.display()), e)
            })?;
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rule_of(err: SkillError) -> &'static str {
        match err {
            SkillError::PathEscape { rule, .. } => rule,
            other => panic!("expected PathEscape, got {other}"),
        }
    }

    #[test]
    fn test_relative_path_resolves_under_base() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("schemas")).unwrap();
        fs::write(tmp.path().join("schemas/input.schema.json"), "{}").unwrap();

        let resolved = safe_join(tmp.path(), "schemas/input.schema.json").unwrap();
        assert!(resolved.ends_with("schemas/input.schema.json"));
        assert!(resolved.starts_with(tmp.path().canonicalize().unwrap()));
    }

    #[test]
    fn test_dot_is_the_base_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        assert_eq!(safe_join(tmp.path(), ".").unwrap(), base);
        assert_eq!(safe_join(tmp.path(), "./").unwrap(), base);
    }

    #[test]
    fn test_absolute_path_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = safe_join(tmp.path(), "/etc/passwd").unwrap_err();
        assert_eq!(rule_of(err), RULE_ABSOLUTE);
    }

    #[test]
    fn test_parent_segments_rejected_anywhere() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        for declared in ["..", "../x", "a/../../x", "a/..", "schemas/../input.json"] {
            let err = safe_join(tmp.path(), declared).unwrap_err();
            assert_eq!(rule_of(err), RULE_PARENT, "{declared}");
        }
    }

    #[test]
    fn test_error_names_path_and_base() {
        let tmp = tempfile::tempdir().unwrap();
        let text = safe_join(tmp.path(), "../secret").unwrap_err().to_string();
        assert!(text.contains("../secret"));
        assert!(text.contains(&tmp.path().display().to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_base_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();
        let err = safe_join(tmp.path(), "link").unwrap_err();
        assert_eq!(rule_of(err), RULE_ESCAPE);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_leaf_under_outward_symlink_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();
        for declared in ["link/not-yet.json", "link/deeper/not-yet.json"] {
            let err = safe_join(tmp.path(), declared).unwrap_err();
            assert_eq!(rule_of(err), RULE_ESCAPE, "{declared}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_leaf_under_inward_symlink_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        fs::create_dir_all(base.join("real")).unwrap();
        std::os::unix::fs::symlink(base.join("real"), base.join("alias")).unwrap();
        let resolved = safe_join(&base, "alias/out.json").unwrap();
        assert_eq!(resolved, base.join("real/out.json"));
    }

    #[test]
    fn test_missing_file_still_resolves() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = safe_join(tmp.path(), "schemas/missing.json").unwrap();
        assert!(resolved.ends_with("schemas/missing.json"));
    }
}
