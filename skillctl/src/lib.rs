//! skillctl CLI library: argument parsing, tracing setup, dispatch and exit codes.

mod cli;
mod command_registry;
mod dispatch;

use clap::Parser;

use skillctl_commands::skill;
use skillctl_core::skill::repo::RepoLayout;
use skillctl_core::{observability, SkillError};

pub use cli::{Cli, Commands};
use command_registry::CommandRegistry;

pub const EXIT_OK: i32 = 0;
/// Validation, execution or output-contract failure.
pub const EXIT_FAILURE: i32 = 1;
/// Environment or setup problem (repo root, skills directory, template).
pub const EXIT_SETUP: i32 = 2;

/// Parse arguments, run the command and return the process exit code.
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    observability::init_tracing();
    run(&cli)
}

/// Run an already parsed command line. Errors are printed to stderr.
pub fn run(cli: &Cli) -> i32 {
    let result = RepoLayout::discover(cli.repo_root.as_deref())
        .inspect_err(|e| {
            if matches!(cli.command, Commands::Run { .. }) {
                skill::report_run_setup_failure(e);
            }
        })
        .map_err(anyhow::Error::from)
        .and_then(|layout| {
            tracing::debug!(root = %layout.root.display(), command = ?cli.command, "Dispatching");
            let mut registry = CommandRegistry::new();
            dispatch::register_all(&mut registry);
            registry.dispatch(&cli.command, &layout)
        });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            exit_code_for(&e)
        }
    }
}

/// 2 for setup errors anywhere in the chain, 1 for everything else.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SkillError>())
        .map(SkillError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
