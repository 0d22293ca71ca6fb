//! Run Report: the structured outcome emitted exactly once per execution attempt.

use serde::Serialize;
use std::io::Write;

use skillctl_core::Value;

use crate::runner::Phase;

pub const REPORT_EVENT: &str = "skill_run_report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Skill identity as far as it could be established. All fields are null when the
/// target never resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillIdentity {
    pub id: Option<String>,
    pub version: Option<String>,
    /// Relative to the repo root when possible.
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub event: &'static str,
    pub skill: SkillIdentity,
    pub status: RunStatus,
    pub duration_ms: u64,
    /// Null when the process never ran to a normal exit (not spawned, timed out, killed).
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// State in which the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl RunReport {
    /// Error report for a run that failed in LOADING before any skill was resolved.
    pub fn loading_failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            event: REPORT_EVENT,
            skill: SkillIdentity::default(),
            status: RunStatus::Error,
            duration_ms,
            exit_code: None,
            error: Some(error.into()),
            phase: Some(Phase::Loading),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// One line of canonical JSON (sorted keys, trailing newline).
    pub fn to_canonical_json(&self) -> String {
        Value::from(self.to_json()).to_canonical_json()
    }
}

/// Destination for child stderr and the run report.
///
/// The executor calls `forward_stderr` (possibly with empty bytes) and then `emit`,
/// exactly once each per run.
pub trait ReportSink {
    fn forward_stderr(&mut self, bytes: &[u8]);
    fn emit(&mut self, report: &RunReport);
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn forward_stderr(&mut self, bytes: &[u8]) {
        (**self).forward_stderr(bytes);
    }

    fn emit(&mut self, report: &RunReport) {
        (**self).emit(report);
    }
}

/// Writes to the process diagnostic stream. Used by the CLI.
#[derive(Debug, Default)]
pub struct StderrReportSink;

impl ReportSink for StderrReportSink {
    fn forward_stderr(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(bytes);
        if !bytes.ends_with(b"\n") {
            let _ = err.write_all(b"\n");
        }
        let _ = err.flush();
    }

    fn emit(&mut self, report: &RunReport) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(report.to_canonical_json().as_bytes());
        let _ = err.flush();
    }
}

/// Keeps everything in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub stderr: Vec<u8>,
    pub reports: Vec<RunReport>,
}

impl ReportSink for CollectingSink {
    fn forward_stderr(&mut self, bytes: &[u8]) {
        self.stderr.extend_from_slice(bytes);
        if !bytes.is_empty() && !bytes.ends_with(b"\n") {
            self.stderr.push(b'\n');
        }
    }

    fn emit(&mut self, report: &RunReport) {
        self.reports.push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: RunStatus) -> RunReport {
        RunReport {
            event: REPORT_EVENT,
            skill: SkillIdentity::default(),
            status,
            duration_ms: 12,
            exit_code: None,
            error: None,
            phase: None,
        }
    }

    #[test]
    fn test_success_report_shape() {
        let mut r = report(RunStatus::Success);
        r.skill = SkillIdentity {
            id: Some("text.count".into()),
            version: Some("0.1.0".into()),
            path: Some("skills/count".into()),
        };
        r.exit_code = Some(0);
        assert_eq!(
            r.to_canonical_json(),
            "{\"durationMs\":12,\"event\":\"skill_run_report\",\"exitCode\":0,\"skill\":{\"id\":\"text.count\",\"path\":\"skills/count\",\"version\":\"0.1.0\"},\"status\":\"success\"}\n"
        );
    }

    #[test]
    fn test_error_report_keeps_nulls_and_phase() {
        let mut r = report(RunStatus::Error);
        r.error = Some("Timed out".into());
        r.phase = Some(Phase::Executing);
        let json = r.to_json();
        assert!(json["exitCode"].is_null());
        assert!(json["skill"]["id"].is_null());
        assert_eq!(json["status"], "error");
        assert_eq!(json["phase"], "EXECUTING");
        assert_eq!(json["error"], "Timed out");
    }

    #[test]
    fn test_collecting_sink_terminates_stderr() {
        let mut sink = CollectingSink::default();
        sink.forward_stderr(b"partial");
        sink.forward_stderr(b"");
        sink.emit(&report(RunStatus::Success));
        assert_eq!(sink.stderr, b"partial\n");
        assert_eq!(sink.reports.len(), 1);
    }
}
