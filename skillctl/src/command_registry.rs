//! Command registry: handlers are tried in registration order; the first one that
//! recognises the parsed command runs it.
//!
//! Adding a command:
//! 1. add a variant to `Commands` in cli.rs
//! 2. register a handler in the dispatch module

use anyhow::Result;
use std::sync::Arc;

use skillctl_core::skill::repo::RepoLayout;

use crate::cli::Commands;

/// Returns `Some(exit code)` when it handles `cmd`, `None` otherwise.
pub type CommandHandler =
    Arc<dyn Fn(&Commands, &RepoLayout) -> Option<Result<i32>> + Send + Sync>;

pub struct CommandRegistry {
    handlers: Vec<CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register<F>(&mut self, f: F)
    where
        F: Fn(&Commands, &RepoLayout) -> Option<Result<i32>> + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(f));
    }

    pub fn dispatch(&self, cmd: &Commands, layout: &RepoLayout) -> Result<i32> {
        for h in &self.handlers {
            if let Some(r) = h(cmd, layout) {
                return r;
            }
        }
        anyhow::bail!("No handler registered for {:?}", cmd)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
