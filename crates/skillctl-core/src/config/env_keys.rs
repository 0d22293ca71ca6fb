//! Environment variable keys.

/// Repository and skills locations
pub mod paths {
    pub const SKILLCTL_REPO_ROOT: &str = "SKILLCTL_REPO_ROOT";

    /// Skills directory, relative to the repository root unless absolute.
    pub const SKILLCTL_SKILLS_DIR: &str = "SKILLCTL_SKILLS_DIR";
    pub const SKILLS_DIR_ALIASES: &[&str] = &["SKILLS_DIR"];
}

/// Child process environment
pub mod runtime {
    /// Comma-separated names passed through to every skill in addition to its own allow-list.
    pub const SKILLCTL_ENV_PASSTHROUGH: &str = "SKILLCTL_ENV_PASSTHROUGH";
}

/// Logging and audit
pub mod observability {
    pub const SKILLCTL_QUIET: &str = "SKILLCTL_QUIET";
    pub const SKILLCTL_LOG_LEVEL: &str = "SKILLCTL_LOG_LEVEL";
    pub const SKILLCTL_LOG_JSON: &str = "SKILLCTL_LOG_JSON";
    pub const SKILLCTL_AUDIT_LOG: &str = "SKILLCTL_AUDIT_LOG";
}
