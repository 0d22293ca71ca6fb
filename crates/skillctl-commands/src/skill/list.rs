//! `skillctl list`: enumerate skills under the skills directory.

use std::io::Write;

use anyhow::Result;
use skillctl_core::skill::repo::RepoLayout;
use skillctl_core::Value;

use super::common;

/// `skillctl list [--json]`
///
/// Text mode prints `id<TAB>version<TAB>name<TAB>path` per skill; JSON mode prints one
/// canonical array. Reserved `_*` directories are never listed.
pub fn cmd_list<W: Write>(layout: &RepoLayout, json: bool, out: &mut W) -> Result<()> {
    let skills = common::open_registry(layout).list()?;
    tracing::debug!(count = skills.len(), "Listed skills");

    if json {
        let payload = Value::from(serde_json::to_value(&skills)?);
        return common::write_canonical(out, &payload);
    }

    for s in &skills {
        writeln!(out, "{}\t{}\t{}\t{}", s.id, s.version, s.name, s.path)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::test_support::Fixture;

    #[test]
    fn test_list_text_and_json() {
        let fx = Fixture::new();
        fx.skill("b-skill", "beta.one", "0.2.0");
        fx.skill("a-skill", "alpha.one", "0.1.0");
        fx.skill("_template", "template.skill", "0.1.0");

        let mut text = Vec::new();
        cmd_list(&fx.layout(), false, &mut text).unwrap();
        assert_eq!(
            String::from_utf8(text).unwrap(),
            "alpha.one\t0.1.0\tTest alpha.one\tskills/a-skill\nbeta.one\t0.2.0\tTest beta.one\tskills/b-skill\n"
        );

        let mut json = Vec::new();
        cmd_list(&fx.layout(), true, &mut json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["id"], "alpha.one");
        assert_eq!(parsed[0]["path"], "skills/a-skill");
        assert!(json.ends_with(b"]\n"));
    }

    #[test]
    fn test_list_empty_json_is_empty_array() {
        let fx = Fixture::new();
        let mut json = Vec::new();
        cmd_list(&fx.layout(), true, &mut json).unwrap();
        assert_eq!(json, b"[]\n");
    }
}
