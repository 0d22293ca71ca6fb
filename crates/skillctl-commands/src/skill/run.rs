//! `skillctl run`: execute one skill through the sandboxed executor.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use skillctl_core::skill::repo::RepoLayout;
use skillctl_core::{observability, SkillError};
use skillctl_sandbox::{
    Executor, InputSource, OutputTarget, ReportSink, RunOutcome, RunReport, StderrReportSink,
};

use super::common;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub target: String,
    /// Input payload file; stdin when absent.
    pub input: Option<PathBuf>,
    /// Output payload file; stdout when absent.
    pub output: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub allow_template: bool,
}

/// `skillctl run <target> [--input FILE] [--output FILE] [--timeout-ms N] [--allow-template]`
///
/// The run report goes to stderr. Returns whether the run succeeded; only setup errors
/// (missing skills directory) are returned as `Err`, after a LOADING error report.
pub fn cmd_run(layout: &RepoLayout, opts: &RunOptions) -> Result<bool> {
    let outcome = cmd_run_with(layout, opts, &mut StderrReportSink)?;
    Ok(outcome.report.is_success())
}

/// Same as [`cmd_run`] with a caller-chosen report sink.
pub fn cmd_run_with<S: ReportSink>(
    layout: &RepoLayout,
    opts: &RunOptions,
    sink: &mut S,
) -> Result<RunOutcome> {
    let started = Instant::now();
    if let Err(e) = layout.require_skills_dir() {
        emit_loading_failure(sink, &e, started);
        return Err(e.into());
    }

    let output = match &opts.output {
        Some(path) => OutputTarget::File(path.clone()),
        None => OutputTarget::Stdout,
    };
    let input = match &opts.input {
        Some(path) => InputSource::File(path),
        None => InputSource::Stdin,
    };

    let mut executor = Executor::new(common::open_registry(layout), sink)
        .with_output(output)
        .allow_reserved(opts.allow_template);
    let outcome = executor.run_source(&opts.target, input, opts.timeout_ms);
    tracing::debug!(
        status = ?outcome.report.status,
        duration_ms = outcome.report.duration_ms,
        "Run finished"
    );
    Ok(outcome)
}

/// Report a `run` that could not start because the repository itself was unusable.
pub fn report_run_setup_failure(err: &SkillError) {
    emit_loading_failure(&mut StderrReportSink, err, Instant::now());
}

fn emit_loading_failure<S: ReportSink>(sink: &mut S, err: &SkillError, started: Instant) {
    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let report = RunReport::loading_failure(err.to_string(), elapsed);
    sink.forward_stderr(&[]);
    sink.emit(&report);
    observability::audit_run_report(&report.to_json());
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::skill::test_support::Fixture;
    use skillctl_sandbox::{CollectingSink, Phase, RunStatus};
    use std::fs;

    #[test]
    fn test_run_file_to_file() {
        let fx = Fixture::new();
        fx.skill("count", "text.count", "0.1.0");
        let input = fx.root.join("in.json");
        let output = fx.root.join("out.json");
        fs::write(&input, r#"{"text":"hello"}"#).unwrap();

        let opts = RunOptions {
            target: "text.count".into(),
            input: Some(input),
            output: Some(output.clone()),
            ..Default::default()
        };
        let outcome = cmd_run_with(&fx.layout(), &opts, &mut CollectingSink::default()).unwrap();
        assert_eq!(outcome.report.status, RunStatus::Success, "{:?}", outcome.report);
        assert_eq!(fs::read_to_string(output).unwrap(), "{\"count\":1}\n");
    }

    #[test]
    fn test_run_invalid_input_fails_with_report() {
        let fx = Fixture::new();
        fx.skill("count", "text.count", "0.1.0");
        let input = fx.root.join("in.json");
        fs::write(&input, r#"{"text":5}"#).unwrap();

        let opts = RunOptions {
            target: "text.count".into(),
            input: Some(input),
            output: Some(fx.root.join("out.json")),
            ..Default::default()
        };
        let outcome = cmd_run_with(&fx.layout(), &opts, &mut CollectingSink::default()).unwrap();
        assert_eq!(outcome.report.phase, Some(Phase::ValidatingInput));
        assert!(!fx.root.join("out.json").exists());
    }

    #[test]
    fn test_run_without_skills_dir_is_setup_error() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.root.join("skills")).unwrap();
        let opts = RunOptions {
            target: "text.count".into(),
            ..Default::default()
        };
        let mut sink = CollectingSink::default();
        let err = cmd_run_with(&fx.layout(), &opts, &mut sink).unwrap_err();
        let skill_err = err.downcast_ref::<SkillError>().unwrap();
        assert_eq!(skill_err.exit_code(), 2);

        assert_eq!(sink.reports.len(), 1);
        let report = &sink.reports[0];
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.phase, Some(Phase::Loading));
        assert_eq!(report.skill.id, None);
        assert_eq!(report.exit_code, None);
        assert!(report.error.as_deref().unwrap().contains("skills directory not found"));
    }

    #[test]
    fn test_repo_setup_failure_reports_loading_phase() {
        let mut sink = CollectingSink::default();
        let err = SkillError::Setup("Repo root not usable: /nowhere".into());
        emit_loading_failure(&mut sink, &err, Instant::now());
        assert_eq!(sink.reports.len(), 1);
        assert_eq!(sink.reports[0].phase, Some(Phase::Loading));
        assert_eq!(sink.reports[0].skill, Default::default());
        assert!(sink.stderr.is_empty());
    }
}
