use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// skillctl - list, validate and run manifest-driven skills
#[derive(Parser, Debug)]
#[command(name = "skillctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override repository root (default: auto-detect from the current directory)
    #[arg(long, global = true, value_name = "DIR", env = "SKILLCTL_REPO_ROOT")]
    pub repo_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List skills under the skills directory
    List {
        /// Print one canonical JSON array instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Show a skill's manifest
    Describe {
        /// Skill id or path (relative to the repo root)
        #[arg(value_name = "TARGET")]
        target: String,

        /// Print the full manifest as canonical JSON
        #[arg(long)]
        json: bool,

        /// Allow targeting skills under skills/_*
        #[arg(long)]
        allow_template: bool,
    },

    /// Validate skill contracts (manifest, schema paths, schema files)
    Validate {
        /// Skill ids or paths
        #[arg(value_name = "TARGET", required_unless_present = "all")]
        targets: Vec<String>,

        /// Validate every skill
        #[arg(long, conflicts_with = "targets")]
        all: bool,

        /// Allow targeting skills under skills/_*
        #[arg(long)]
        allow_template: bool,
    },

    /// Run a skill: JSON in on stdin (or --input), JSON out on stdout (or --output)
    Run {
        /// Skill id or path (relative to the repo root)
        #[arg(value_name = "TARGET")]
        target: String,

        /// Path to the JSON input file (default: stdin)
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the output JSON to a file (default: stdout)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Wall-clock timeout; overrides runtime.timeoutMs
        #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,

        /// Allow targeting skills under skills/_*
        #[arg(long)]
        allow_template: bool,
    },

    /// Create a new skill from skills/_template
    Scaffold {
        /// New skill id (example: fs.hash_tree)
        #[arg(value_name = "SKILL_ID")]
        skill_id: String,

        /// New skill directory under skills/ (example: fs-hash-tree)
        #[arg(value_name = "SLUG")]
        slug: String,

        /// Human-friendly name (default: the skill id)
        #[arg(long)]
        name: Option<String>,

        /// Short description for discovery
        #[arg(long)]
        description: Option<String>,

        /// Initial semver version (default: 0.1.0)
        #[arg(long)]
        version: Option<String>,

        /// Spec ID UUID (default: generated)
        #[arg(long)]
        spec_id: Option<String>,
    },
}
