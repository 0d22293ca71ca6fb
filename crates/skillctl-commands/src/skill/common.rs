//! Shared helpers for skill commands.

use std::io::Write;

use anyhow::Result;
use skillctl_core::schema::{meta, Schema, ValidationMode};
use skillctl_core::skill::contract::SkillContract;
use skillctl_core::skill::registry::Registry;
use skillctl_core::skill::repo::RepoLayout;
use skillctl_core::Value;

pub fn open_registry(layout: &RepoLayout) -> Registry {
    Registry::new(layout.clone())
}

/// Meta-schema for the layout's skills directory (override or built-in).
pub fn meta_schema(layout: &RepoLayout) -> skillctl_core::Result<Schema> {
    meta::load_skill_schema(&layout.skills_dir)
}

/// Resolve a target and load its full contract, reporting every manifest violation.
pub fn load_contract(
    registry: &Registry,
    meta: &Schema,
    target: &str,
    allow_template: bool,
) -> skillctl_core::Result<SkillContract> {
    let dir = registry.resolve(target, allow_template)?;
    SkillContract::load(&dir, meta, ValidationMode::CollectAll)
}

/// Write one canonical JSON line.
pub fn write_canonical<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    out.write_all(value.to_canonical_json().as_bytes())?;
    out.flush()?;
    Ok(())
}
