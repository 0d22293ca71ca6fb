//! Observability: tracing init and the JSONL audit trail.
//!
//! Uses config::ObservabilityConfig for SKILLCTL_QUIET, LOG_LEVEL, LOG_JSON and AUDIT_LOG.
//! All log output goes to stderr; stdout carries payloads only.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call once at process startup.
/// When SKILLCTL_QUIET=1, only WARN and above are logged. RUST_LOG overrides the level.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "skillctl=warn".to_string()
    } else {
        cfg.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn audit_path() -> Option<&'static Path> {
    static AUDIT_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
    AUDIT_PATH
        .get_or_init(|| {
            let path = PathBuf::from(crate::config::ObservabilityConfig::from_env().audit_log.clone()?);
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Some(path)
        })
        .as_deref()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Append one JSON record as a line.
pub fn append_jsonl(path: &Path, record: &serde_json::Value) -> std::io::Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{}", record)
}

fn audit(record: serde_json::Value) {
    let Some(path) = audit_path() else { return };
    if let Err(e) = append_jsonl(path, &record) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to write audit record");
    }
}

/// Audit: execution_started (right before spawn)
pub fn audit_execution_started(skill_id: &str, command: &[String], cwd: &Path) {
    audit(json!({
        "ts": timestamp(),
        "event": "execution_started",
        "skill_id": skill_id,
        "cmd": command.first(),
        "args": command.get(1..).unwrap_or_default(),
        "cwd": cwd.display().to_string(),
    }));
}

/// Audit: execution_completed. `exit_code` is `None` when the child was killed.
pub fn audit_execution_completed(
    skill_id: &str,
    exit_code: Option<i32>,
    duration_ms: u64,
    stdout_len: usize,
    timed_out: bool,
) {
    audit(json!({
        "ts": timestamp(),
        "event": "execution_completed",
        "skill_id": skill_id,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "stdout_len": stdout_len,
        "timed_out": timed_out,
        "success": exit_code == Some(0),
    }));
}

/// Audit: run_report (copy of every report emitted)
pub fn audit_run_report(report: &serde_json::Value) {
    audit(json!({
        "ts": timestamp(),
        "event": "run_report",
        "report": report,
    }));
}
