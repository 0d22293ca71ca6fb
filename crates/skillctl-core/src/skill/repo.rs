//! Repository layout: root detection and the skills directory.

use std::path::{Path, PathBuf};

use crate::config::PathsConfig;
use crate::error::{Result, SkillError};

/// Files or directories whose presence marks a repository root.
pub const ROOT_MARKERS: &[&str] = &[".git", "AGENTS.md"];

/// Walk up from `start` until a directory holding a root marker is found.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = start
        .canonicalize()
        .map_err(|e| SkillError::io(format!("Invalid start directory {}", start.display()), e))?;
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
        .ok_or_else(|| SkillError::Setup(format!("Could not locate repo root from: {}", start.display())))
}

#[derive(Debug, Clone)]
pub struct RepoLayout {
    pub root: PathBuf,
    pub skills_dir: PathBuf,
}

impl RepoLayout {
    /// Build a layout for a known root, taking the skills directory from config.
    pub fn new(root: PathBuf, paths: &PathsConfig) -> Self {
        let configured = PathBuf::from(&paths.skills_dir);
        let skills_dir = if configured.is_absolute() {
            configured
        } else {
            root.join(configured)
        };
        Self { root, skills_dir }
    }

    /// Root precedence: explicit override, then `SKILLCTL_REPO_ROOT`, then auto-detect from cwd.
    pub fn discover(root_override: Option<&Path>) -> Result<Self> {
        let paths = PathsConfig::from_env();
        let root = match root_override.map(Path::to_path_buf).or_else(|| paths.repo_root.clone()) {
            Some(root) => root.canonicalize().map_err(|e| {
                SkillError::Setup(format!("Repo root not usable: {} ({})", root.display(), e))
            })?,
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|e| SkillError::Setup(format!("Cannot read current directory: {}", e)))?;
                find_repo_root(&cwd)?
            }
        };
        tracing::debug!(root = %root.display(), "Resolved repo root");
        Ok(Self::new(root, &paths))
    }

    /// Skills directory, failing with a setup error when absent.
    pub fn require_skills_dir(&self) -> Result<&Path> {
        if self.skills_dir.is_dir() {
            Ok(&self.skills_dir)
        } else {
            Err(SkillError::Setup(format!(
                "skills directory not found at: {}",
                self.skills_dir.display()
            )))
        }
    }

    /// `path` relative to the repo root when it lies beneath it, otherwise unchanged.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
