//! Skill discovery, manifests and contracts.

pub mod contract;
pub mod manifest;
pub mod registry;
pub mod repo;

/// Manifest file expected in every skill directory.
pub const MANIFEST_FILE_NAME: &str = "skill.yaml";

/// Directories starting with this prefix (`_template`, `_schema`) are not skills.
pub const RESERVED_PREFIX: char = '_';

pub fn is_reserved_dir_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}
