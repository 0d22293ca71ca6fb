//! Skill commands: list, describe, validate, run, scaffold.
//!
//! Depends only on the core registry/contract layer and the sandbox executor.

mod common;
mod describe;
mod list;
mod run;
mod scaffold;
mod validate;

pub use describe::cmd_describe;
pub use list::cmd_list;
pub use run::{cmd_run, cmd_run_with, report_run_setup_failure, RunOptions};
pub use scaffold::{cmd_scaffold, ScaffoldOptions, Scaffolded, TEMPLATE_DIR_NAME};
pub use validate::cmd_validate;

#[cfg(test)]
pub(crate) mod test_support;
