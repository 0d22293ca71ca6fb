//! Skill executor: a linear state machine that always ends in exactly one Run Report.
//!
//! LOADING -> VALIDATING_MANIFEST -> VALIDATING_INPUT -> EXECUTING -> VALIDATING_OUTPUT -> DONE
//!
//! Any failing state short-circuits to the report with `status: "error"` and the state
//! recorded as `phase`. Input is validated before anything is spawned.

use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use skillctl_core::config::RuntimeConfig;
use skillctl_core::observability;
use skillctl_core::schema::{meta, ValidationMode};
use skillctl_core::skill::contract::SkillContract;
use skillctl_core::skill::manifest::read_manifest_value;
use skillctl_core::skill::registry::Registry;
use skillctl_core::Value;

use crate::env::builder::build_child_env;
use crate::report::{ReportSink, RunReport, RunStatus, SkillIdentity, REPORT_EVENT};
use crate::sandbox_backend::{
    ExecutionRequest, ExecutionResult, NativeSandboxBackend, SandboxBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Loading,
    ValidatingManifest,
    ValidatingInput,
    Executing,
    ValidatingOutput,
    Done,
}

/// Where a validated output payload is written.
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    #[default]
    Discard,
    Stdout,
    File(PathBuf),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Present only on success.
    pub output: Option<Value>,
}

/// Where the input payload comes from. Reading happens in VALIDATING_INPUT, so an
/// unreadable source still ends in a report.
#[derive(Debug, Clone, Copy)]
pub enum InputSource<'a> {
    Parsed(&'a Value),
    Raw(&'a [u8]),
    File(&'a Path),
    Stdin,
}

enum State {
    Loading,
    ValidatingManifest { dir: PathBuf },
    ValidatingInput { contract: Box<SkillContract> },
    Executing { contract: Box<SkillContract>, input: Value },
    ValidatingOutput { contract: Box<SkillContract>, result: ExecutionResult },
    Done { output: Value },
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Loading => Phase::Loading,
            State::ValidatingManifest { .. } => Phase::ValidatingManifest,
            State::ValidatingInput { .. } => Phase::ValidatingInput,
            State::Executing { .. } => Phase::Executing,
            State::ValidatingOutput { .. } => Phase::ValidatingOutput,
            State::Done { .. } => Phase::Done,
        }
    }
}

/// Facts gathered along the way that end up in the report.
#[derive(Default)]
struct RunTrace {
    identity: SkillIdentity,
    exit_code: Option<i32>,
    stderr: Vec<u8>,
}

pub struct Executor<S: ReportSink> {
    registry: Registry,
    backend: Box<dyn SandboxBackend>,
    runtime: RuntimeConfig,
    sink: S,
    output: OutputTarget,
    allow_reserved: bool,
}

impl<S: ReportSink> Executor<S> {
    pub fn new(registry: Registry, sink: S) -> Self {
        Self {
            registry,
            backend: Box::new(NativeSandboxBackend),
            runtime: RuntimeConfig::from_env(),
            sink,
            output: OutputTarget::Discard,
            allow_reserved: false,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn SandboxBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// Allow targeting reserved `_*` directories by path.
    pub fn allow_reserved(mut self, allow: bool) -> Self {
        self.allow_reserved = allow;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run with an already parsed payload.
    pub fn run(&mut self, target: &str, input: &Value, timeout_override_ms: Option<u64>) -> RunOutcome {
        self.run_source(target, InputSource::Parsed(input), timeout_override_ms)
    }

    /// Run with raw payload bytes; malformed JSON fails in VALIDATING_INPUT with a report.
    pub fn run_raw(&mut self, target: &str, input: &[u8], timeout_override_ms: Option<u64>) -> RunOutcome {
        self.run_source(target, InputSource::Raw(input), timeout_override_ms)
    }

    pub fn run_source(
        &mut self,
        target: &str,
        input: InputSource<'_>,
        timeout_override_ms: Option<u64>,
    ) -> RunOutcome {
        let started = Instant::now();
        let mut trace = RunTrace::default();
        let mut state = State::Loading;

        let result = loop {
            let phase = state.phase();
            tracing::debug!(?phase, skill_target = target, "Run state");
            let next = match state {
                State::Done { output } => break Ok(output),
                other => self.step(other, target, &input, timeout_override_ms, &mut trace),
            };
            match next {
                Ok(s) => state = s,
                Err(message) => break Err((phase, message)),
            }
        };

        let (status, error, phase, output) = match result {
            Ok(output) => (RunStatus::Success, None, None, Some(output)),
            Err((phase, message)) => {
                tracing::debug!(?phase, error = %message, "Run failed");
                (RunStatus::Error, Some(message), Some(phase), None)
            }
        };
        let report = RunReport {
            event: REPORT_EVENT,
            skill: trace.identity,
            status,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            exit_code: trace.exit_code,
            error,
            phase,
        };

        self.sink.forward_stderr(&trace.stderr);
        self.sink.emit(&report);
        observability::audit_run_report(&report.to_json());
        RunOutcome { report, output }
    }

    fn step(
        &self,
        state: State,
        target: &str,
        input: &InputSource<'_>,
        timeout_override_ms: Option<u64>,
        trace: &mut RunTrace,
    ) -> Result<State, String> {
        match state {
            State::Loading => {
                let dir = self
                    .registry
                    .resolve(target, self.allow_reserved)
                    .map_err(|e| e.to_string())?;
                trace.identity.path =
                    Some(self.registry.layout().relative(&dir).display().to_string());
                Ok(State::ValidatingManifest { dir })
            }

            State::ValidatingManifest { dir } => {
                let meta = meta::load_skill_schema(&self.registry.layout().skills_dir)
                    .map_err(|e| e.to_string())?;
                match SkillContract::load(&dir, &meta, ValidationMode::FailFast) {
                    Ok(contract) => {
                        trace.identity.id = Some(contract.manifest.id.clone());
                        trace.identity.version = Some(contract.manifest.version.clone());
                        Ok(State::ValidatingInput {
                            contract: Box::new(contract),
                        })
                    }
                    Err(e) => {
                        // Best effort: name the skill even when its manifest is invalid.
                        if let Ok(raw) = read_manifest_value(&dir) {
                            trace.identity.id = raw.get("id").and_then(Value::as_str).map(str::to_string);
                            trace.identity.version =
                                raw.get("version").and_then(Value::as_str).map(str::to_string);
                        }
                        Err(e.to_string())
                    }
                }
            }

            State::ValidatingInput { contract } => {
                let payload = match input {
                    InputSource::Parsed(v) => (*v).clone(),
                    InputSource::Raw(bytes) => parse_json_payload(bytes, "Input")?,
                    InputSource::File(path) => {
                        let bytes = fs::read(path).map_err(|e| {
                            format!("Failed to read input file {}: {}", path.display(), e)
                        })?;
                        parse_json_payload(&bytes, "Input")?
                    }
                    InputSource::Stdin => {
                        let mut bytes = Vec::new();
                        std::io::stdin()
                            .lock()
                            .read_to_end(&mut bytes)
                            .map_err(|e| format!("Failed to read input from stdin: {}", e))?;
                        parse_json_payload(&bytes, "Input")?
                    }
                };
                contract
                    .input_schema
                    .check(&payload, "Input", ValidationMode::CollectAll)
                    .map_err(|e| e.to_string())?;
                Ok(State::Executing {
                    contract,
                    input: payload,
                })
            }

            State::Executing { contract, input } => {
                let manifest = &contract.manifest;
                let timeout_ms = timeout_override_ms.unwrap_or(manifest.runtime.timeout_ms);
                let request = ExecutionRequest {
                    skill_id: manifest.id.clone(),
                    command: manifest.runtime.command.clone(),
                    cwd: contract.working_dir.clone(),
                    env: build_child_env(&manifest.security.env_read, &self.runtime.env_passthrough),
                    stdin: input.to_canonical_json().into_bytes(),
                    timeout: Duration::from_millis(timeout_ms),
                };

                crate::info_log!(
                    "Running {} {} (timeout {} ms, {} env vars)",
                    manifest.id,
                    manifest.version,
                    timeout_ms,
                    request.env.len()
                );
                observability::audit_execution_started(
                    &manifest.id,
                    &manifest.runtime.command,
                    &contract.working_dir,
                );
                let mut result = self
                    .backend
                    .execute(&request)
                    .map_err(|e| format!("{:#}", e))?;
                observability::audit_execution_completed(
                    &manifest.id,
                    result.exit_code,
                    u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
                    result.stdout.len(),
                    result.timed_out,
                );

                trace.exit_code = result.exit_code;
                trace.stderr = std::mem::take(&mut result.stderr);
                if result.timed_out {
                    return Err(format!("Skill timed out after {} ms", timeout_ms));
                }
                match result.exit_code {
                    Some(0) => Ok(State::ValidatingOutput { contract, result }),
                    Some(code) => Err(format!("Skill exited with code {}", code)),
                    None => Err("Skill was terminated by a signal".to_string()),
                }
            }

            State::ValidatingOutput { contract, result } => {
                let output = parse_json_payload(&result.stdout, "Skill stdout")?;
                contract
                    .output_schema
                    .check(&output, "Output", ValidationMode::CollectAll)
                    .map_err(|e| e.to_string())?;
                self.deliver(&output)?;
                Ok(State::Done { output })
            }

            State::Done { output } => Ok(State::Done { output }),
        }
    }

    fn deliver(&self, output: &Value) -> Result<(), String> {
        let text = output.to_canonical_json();
        match &self.output {
            OutputTarget::Discard => Ok(()),
            OutputTarget::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| format!("Failed to write output to stdout: {}", e))
            }
            OutputTarget::File(path) => fs::write(path, text)
                .map_err(|e| format!("Failed to write output to {}: {}", path.display(), e)),
        }
    }
}

fn parse_json_payload(bytes: &[u8], what: &str) -> Result<Value, String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| format!("{} is not valid UTF-8 JSON: {}", what, e))?;
    Value::from_json_str(text).map_err(|e| format!("{} is not valid JSON: {}", what, e))
}
