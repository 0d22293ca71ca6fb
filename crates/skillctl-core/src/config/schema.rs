//! Configuration structs grouped by concern, loaded from the environment.

use super::env_keys::{observability as obv_keys, paths, runtime};
use super::loader::{env_bool, env_list, env_optional, env_or};
use std::path::PathBuf;

pub const DEFAULT_SKILLS_DIR: &str = "skills";
pub const DEFAULT_LOG_LEVEL: &str = "skillctl=info";

/// Repository and skills locations
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Explicit repository root; auto-detected when unset.
    pub repo_root: Option<PathBuf>,
    /// Skills directory, relative to the repository root unless absolute.
    pub skills_dir: String,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        Self {
            repo_root: env_optional(paths::SKILLCTL_REPO_ROOT, &[]).map(PathBuf::from),
            skills_dir: env_or(paths::SKILLCTL_SKILLS_DIR, paths::SKILLS_DIR_ALIASES, || {
                DEFAULT_SKILLS_DIR.to_string()
            }),
        }
    }
}

/// Logging and audit settings. Read once per process.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| Self {
            quiet: env_bool(obv_keys::SKILLCTL_QUIET, &[], false),
            log_level: env_or(obv_keys::SKILLCTL_LOG_LEVEL, &[], || {
                DEFAULT_LOG_LEVEL.to_string()
            }),
            log_json: env_bool(obv_keys::SKILLCTL_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::SKILLCTL_AUDIT_LOG, &[]),
        })
    }
}

/// Settings applied to every skill process.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Extra environment names passed to every skill, on top of its manifest allow-list.
    pub env_passthrough: Vec<String>,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            env_passthrough: env_list(runtime::SKILLCTL_ENV_PASSTHROUGH, &[]),
        }
    }
}
