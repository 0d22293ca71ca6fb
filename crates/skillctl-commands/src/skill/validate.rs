//! `skillctl validate`: batch contract validation.

use anyhow::Result;
use skillctl_core::skill::repo::RepoLayout;

use super::common;

/// `skillctl validate <target...> | --all [--allow-template]`
///
/// Every target is checked (collect-all); the error lists each failing target on its own
/// line. Returns the number of targets validated.
pub fn cmd_validate(
    layout: &RepoLayout,
    targets: &[String],
    all: bool,
    allow_template: bool,
) -> Result<usize> {
    let registry = common::open_registry(layout);
    let meta = common::meta_schema(layout)?;

    let targets: Vec<String> = if all {
        registry
            .skill_dirs(allow_template)?
            .iter()
            .map(|dir| layout.relative(dir).display().to_string())
            .collect()
    } else {
        targets.to_vec()
    };

    let mut failures = Vec::new();
    for target in &targets {
        match common::load_contract(&registry, &meta, target, allow_template) {
            Ok(contract) => {
                tracing::debug!(skill_target = %target, id = %contract.manifest.id, "Contract valid");
            }
            Err(e) => failures.push(format!("- {}: {}", target, e)),
        }
    }

    if !failures.is_empty() {
        anyhow::bail!("Validation failed:\n{}", failures.join("\n"));
    }
    tracing::info!("Validated {} skill(s)", targets.len());
    Ok(targets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::test_support::Fixture;
    use std::fs;

    #[test]
    fn test_validate_all_passes() {
        let fx = Fixture::new();
        fx.skill("a", "alpha.one", "0.1.0");
        fx.skill("b", "beta.one", "0.1.0");
        assert_eq!(cmd_validate(&fx.layout(), &[], true, false).unwrap(), 2);
    }

    #[test]
    fn test_validate_collects_every_failure() {
        let fx = Fixture::new();
        fx.skill("ok", "ok.one", "0.1.0");
        let v = fx.skill("badver", "bad.version", "0.1.0");
        let text = fs::read_to_string(v.join("skill.yaml")).unwrap();
        fs::write(v.join("skill.yaml"), text.replace("version: 0.1.0", "version: one")).unwrap();
        let p = fx.skill("escape", "bad.escape", "0.1.0");
        let text = fs::read_to_string(p.join("skill.yaml")).unwrap();
        fs::write(
            p.join("skill.yaml"),
            text.replace("schemas/input.schema.json", "../../secret.json"),
        )
        .unwrap();

        let err = cmd_validate(&fx.layout(), &[], true, false).unwrap_err().to_string();
        assert!(err.starts_with("Validation failed:\n"), "{err}");
        assert!(err.contains("- skills/badver: "), "{err}");
        assert!(err.contains("/version"), "{err}");
        assert!(err.contains("- skills/escape: Parent path segments are not allowed"), "{err}");
        assert!(!err.contains("skills/ok"), "{err}");
    }

    #[test]
    fn test_validate_template_needs_opt_in() {
        let fx = Fixture::new();
        fx.skill("_template", "template.skill", "0.1.0");
        assert!(cmd_validate(&fx.layout(), &["skills/_template".into()], false, false).is_err());
        assert!(cmd_validate(&fx.layout(), &["skills/_template".into()], false, true).is_ok());
        assert_eq!(cmd_validate(&fx.layout(), &[], true, true).unwrap(), 1);
    }

    #[test]
    fn test_validate_uses_repository_meta_schema() {
        let fx = Fixture::new();
        fx.skill("a", "alpha.one", "0.1.0");
        let schema_dir = fx.layout().skills_dir.join("_schema");
        fs::create_dir_all(&schema_dir).unwrap();
        fs::write(
            schema_dir.join("skill.schema.json"),
            r#"{"type":"object","required":["owner"]}"#,
        )
        .unwrap();
        let err = cmd_validate(&fx.layout(), &["alpha.one".into()], false, false).unwrap_err();
        assert!(err.to_string().contains("missing required key 'owner'"));
    }
}
