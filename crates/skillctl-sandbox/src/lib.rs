pub mod common;
pub mod env;
pub mod log;
pub mod report;
pub mod runner;
pub mod sandbox_backend;

pub use report::{CollectingSink, RunReport, RunStatus, ReportSink, StderrReportSink};
pub use runner::{Executor, InputSource, OutputTarget, Phase, RunOutcome};
