//! `skillctl scaffold`: create a new skill from `skills/_template`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use skillctl_core::parser::to_config_string;
use skillctl_core::skill::repo::RepoLayout;
use skillctl_core::skill::MANIFEST_FILE_NAME;
use skillctl_core::{Mapping, SkillError, Value};

pub const TEMPLATE_DIR_NAME: &str = "_template";

/// Template subdirectories copied into every new skill.
const TEMPLATE_SUBDIRS: &[&str] = &["schemas", "impl", "fixtures", "tests"];

const SKILL_ID_PATTERN: &str = r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$";
const SLUG_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";
const DEFAULT_VERSION: &str = "0.1.0";
const SPECS_DIR: &str = "specs";

#[derive(Debug, Clone, Default)]
pub struct ScaffoldOptions {
    /// Dot-namespaced id, e.g. `fs.hash_tree`.
    pub skill_id: String,
    /// Kebab-case directory name under the skills directory.
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub spec_id: Option<String>,
}

/// Paths created by a scaffold.
#[derive(Debug)]
pub struct Scaffolded {
    pub skill_dir: PathBuf,
    pub spec_path: PathBuf,
    /// False when the spec file already existed and was left alone.
    pub spec_written: bool,
}

fn check_pattern(pattern: &str, value: &str, message: &str) -> Result<()> {
    let re = Regex::new(pattern).context("Invalid built-in pattern")?;
    if !re.is_match(value) {
        anyhow::bail!("{}", message);
    }
    Ok(())
}

/// `skillctl scaffold <skill_id> <slug> [--name] [--description] [--version] [--spec-id]`
pub fn cmd_scaffold(layout: &RepoLayout, opts: &ScaffoldOptions) -> Result<Scaffolded> {
    check_pattern(
        SKILL_ID_PATTERN,
        &opts.skill_id,
        "Invalid skill id (expected dot-namespace with snake segments), example: schema.validate_json",
    )?;
    check_pattern(
        SLUG_PATTERN,
        &opts.slug,
        "Invalid skill slug (expected kebab-case), example: schema-validate-json",
    )?;

    let skill_id = opts.skill_id.as_str();
    let name = opts.name.clone().unwrap_or_else(|| skill_id.to_string());
    let description = opts
        .description
        .clone()
        .unwrap_or_else(|| format!("Scaffolded skill package for {}.", skill_id));
    let version = opts.version.clone().unwrap_or_else(|| DEFAULT_VERSION.to_string());
    let spec_id = opts
        .spec_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let skills_dir = layout.require_skills_dir()?;
    let template_dir = skills_dir.join(TEMPLATE_DIR_NAME);
    if !template_dir.is_dir() {
        return Err(SkillError::Setup(format!(
            "Skill template directory not found: {}",
            template_dir.display()
        ))
        .into());
    }
    for sub in TEMPLATE_SUBDIRS {
        if !template_dir.join(sub).is_dir() {
            return Err(SkillError::Setup(format!(
                "Template missing required directory: {}",
                template_dir.join(sub).display()
            ))
            .into());
        }
    }

    let dest = skills_dir.join(&opts.slug);
    if dest.exists() {
        anyhow::bail!("Destination already exists: {}", dest.display());
    }
    fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let manifest = render_manifest(skill_id, &name, &version, &description, &spec_id);
    let populate = || -> Result<()> {
        for sub in TEMPLATE_SUBDIRS {
            copy_tree(&template_dir.join(sub), &dest.join(sub))?;
        }
        let path = dest.join(MANIFEST_FILE_NAME);
        fs::write(&path, to_config_string(&manifest))
            .with_context(|| format!("Failed to write {}", path.display()))
    };
    if let Err(e) = populate() {
        let _ = fs::remove_dir_all(&dest);
        return Err(e);
    }

    let specs_dir = layout.root.join(SPECS_DIR);
    fs::create_dir_all(&specs_dir)
        .with_context(|| format!("Failed to create {}", specs_dir.display()))?;
    let spec_path = specs_dir.join(format!("skill-{}-v1.md", opts.slug));
    let spec_written = !spec_path.exists();
    if spec_written {
        fs::write(&spec_path, render_spec(skill_id, &opts.slug, &spec_id))
            .with_context(|| format!("Failed to write {}", spec_path.display()))?;
    }

    tracing::info!("Scaffolded skill directory: {}", layout.relative(&dest).display());
    tracing::info!("Scaffolded spec file: {}", layout.relative(&spec_path).display());
    Ok(Scaffolded {
        skill_dir: dest,
        spec_path,
        spec_written,
    })
}

/// Recursive copy. Symlinks are followed so the new skill never points back into the template.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Mapping(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<Mapping>(),
    )
}

fn seq<const N: usize>(items: [Value; N]) -> Value {
    Value::Sequence(items.into())
}

fn render_manifest(
    skill_id: &str,
    name: &str,
    version: &str,
    description: &str,
    spec_id: &str,
) -> Value {
    let empty_list = || Value::Sequence(Vec::new());
    map([
        ("apiVersion", "skill/v1".into()),
        ("kind", "Skill".into()),
        ("id", skill_id.into()),
        ("name", name.into()),
        ("version", version.into()),
        ("description", description.into()),
        (
            "governance",
            map([
                ("specId", spec_id.into()),
                ("oneSkillPerCommit", Value::Bool(true)),
                ("concepts", empty_list()),
                ("synchronizations", empty_list()),
            ]),
        ),
        (
            "runtime",
            map([
                ("type", "command".into()),
                ("command", seq(["sh".into(), "impl/run.sh".into()])),
                ("cwd", ".".into()),
                ("timeoutMs", Value::Int(60_000)),
            ]),
        ),
        (
            "io",
            map([
                ("inputSchema", "schemas/input.schema.json".into()),
                ("outputSchema", "schemas/output.schema.json".into()),
                ("input", map([("transport", "stdin".into()), ("encoding", "json".into())])),
                ("output", map([("transport", "stdout".into()), ("encoding", "json".into())])),
            ]),
        ),
        (
            "determinism",
            map([
                ("network", "forbidden".into()),
                ("time", "forbidden".into()),
                ("randomness", "forbidden".into()),
            ]),
        ),
        (
            "security",
            map([(
                "access",
                map([
                    (
                        "filesystem",
                        map([("read", empty_list()), ("write", empty_list())]),
                    ),
                    ("env", map([("read", empty_list())])),
                    ("subprocess", map([("allowed", Value::Bool(false))])),
                    ("network", map([("allowed", Value::Bool(false))])),
                ]),
            )]),
        ),
        (
            "observability",
            map([
                ("logs", map([("format", "jsonl".into()), ("destination", "stderr".into())])),
                ("runReport", map([("enabled", Value::Bool(true))])),
            ]),
        ),
        ("x-notes", Value::Mapping(Mapping::new())),
    ])
}

fn render_spec(skill_id: &str, slug: &str, spec_id: &str) -> String {
    [
        format!("Spec Title: Skill {} v1 (Scaffold)", skill_id),
        format!("Spec ID: {}", spec_id),
        format!(
            "User Story: As an execution agent or CLI user, I need the skill `{}` so it can be selected and run deterministically.",
            skill_id
        ),
        String::new(),
        "Functional Requirements:".into(),
        format!("- Provide the skill `{}` under `skills/{}/`.", skill_id, slug),
        "- JSON stdin/stdout contracts in `schemas/input.schema.json` and `schemas/output.schema.json`.".into(),
        String::new(),
        "Non-functional Requirements:".into(),
        "- Deterministic: no network, time or randomness unless declared.".into(),
        "- Stateless: nothing persisted outside declared filesystem write globs.".into(),
        String::new(),
        "Testing Plan:".into(),
        "- Offline fixtures under `fixtures/` and a smoke test under `tests/`.".into(),
        String::new(),
        "Security Constraints:".into(),
        "- Declare all access in `skill.yaml` under `security.access`; network is denied by default.".into(),
        String::new(),
    ]
    .join("\n")
}
