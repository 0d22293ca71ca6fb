//! `skillctl describe`: show one skill's manifest.

use std::io::Write;

use anyhow::Result;
use skillctl_core::skill::repo::RepoLayout;

use super::common;

/// `skillctl describe <target> [--json] [--allow-template]`
///
/// Loads the full contract, so anything `validate` rejects fails here too.
pub fn cmd_describe<W: Write>(
    layout: &RepoLayout,
    target: &str,
    json: bool,
    allow_template: bool,
    out: &mut W,
) -> Result<()> {
    let registry = common::open_registry(layout);
    let meta = common::meta_schema(layout)?;
    let contract = common::load_contract(&registry, &meta, target, allow_template)?;

    if json {
        return common::write_canonical(out, &contract.manifest.raw);
    }

    let m = &contract.manifest;
    writeln!(out, "id: {}", m.id)?;
    writeln!(out, "name: {}", m.name)?;
    writeln!(out, "version: {}", m.version)?;
    writeln!(out, "path: {}", layout.relative(&contract.dir).display())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::test_support::Fixture;
    use crate::skill::validate::cmd_validate;
    use skillctl_core::SkillError;

    #[test]
    fn test_describe_text() {
        let fx = Fixture::new();
        fx.skill("count", "text.count", "1.0.0");
        let mut out = Vec::new();
        cmd_describe(&fx.layout(), "text.count", false, false, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id: text.count\nname: Test text.count\nversion: 1.0.0\npath: skills/count\n"
        );
    }

    #[test]
    fn test_describe_json_is_canonical_manifest() {
        let fx = Fixture::new();
        fx.skill("count", "text.count", "1.0.0");
        let mut out = Vec::new();
        cmd_describe(&fx.layout(), "skills/count", true, false, &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["runtime"]["command"][0], "sh");
        assert_eq!(parsed["io"]["inputSchema"], "schemas/input.schema.json");
        // keys sorted
        let text = String::from_utf8(out).unwrap();
        assert!(text.find("\"id\"").unwrap() < text.find("\"io\"").unwrap());
    }

    #[test]
    fn test_describe_unknown_target() {
        let fx = Fixture::new();
        let err = cmd_describe(&fx.layout(), "no.such", false, false, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SkillError>(),
            Some(SkillError::UnknownSkill(_))
        ));
    }

    #[test]
    fn test_describe_and_validate_agree() {
        let fx = Fixture::new();
        fx.skill("good", "good.skill", "0.1.0");
        let bad = fx.skill("bad", "bad.skill", "0.1.0");
        std::fs::remove_file(bad.join("schemas/output.schema.json")).unwrap();

        for (target, ok) in [("skills/good", true), ("skills/bad", false)] {
            let described = cmd_describe(&fx.layout(), target, false, false, &mut Vec::new());
            let validated = cmd_validate(&fx.layout(), &[target.to_string()], false, false);
            assert_eq!(described.is_ok(), ok, "{target}");
            assert_eq!(validated.is_ok(), ok, "{target}");
        }
    }
}
