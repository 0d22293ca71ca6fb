//! Build the child process environment from explicit allow-lists.
//!
//! The child starts from an empty environment. Only names declared by the manifest
//! (`security.access.env.read`) or configured globally (`SKILLCTL_ENV_PASSTHROUGH`) are
//! copied from the parent, and only when the parent actually has them.

use std::collections::BTreeSet;
use std::ffi::OsString;

/// Environment entries for the child, sorted by name.
pub fn build_child_env(manifest_allow: &[String], passthrough: &[String]) -> Vec<(String, OsString)> {
    build_child_env_from(manifest_allow, passthrough, |name| std::env::var_os(name))
}

/// Same as [`build_child_env`] with an injectable lookup.
pub fn build_child_env_from<F>(
    manifest_allow: &[String],
    passthrough: &[String],
    lookup: F,
) -> Vec<(String, OsString)>
where
    F: Fn(&str) -> Option<OsString>,
{
    let names: BTreeSet<&str> = manifest_allow
        .iter()
        .chain(passthrough)
        .map(String::as_str)
        .filter(|n| !n.is_empty() && !n.contains('='))
        .collect();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match lookup(name) {
            Some(value) => out.push((name.to_string(), value)),
            None => tracing::debug!(name, "Allowed env var not set in parent; skipping"),
        }
    }
    out
}
