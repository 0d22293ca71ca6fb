//! SandboxBackend trait: extension point for process execution.
//!
//! The executor only talks to this trait, so tests and future isolation strategies can
//! swap the way a skill process is started without touching the run state machine.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::common::{feed_stdin, wait_with_timeout};

/// Everything needed to start one skill process.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Skill id, used for logging and audit
    pub skill_id: String,
    /// argv; the first element is the program
    pub command: Vec<String>,
    pub cwd: PathBuf,
    /// Complete child environment; nothing else is inherited.
    pub env: Vec<(String, OsString)>,
    pub stdin: Vec<u8>,
    pub timeout: Duration,
}

/// Execution result from a backend
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when killed on timeout or by a signal
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Extension point for execution backends.
pub trait SandboxBackend: Send + Sync {
    /// Backend name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Run the request to completion or timeout. Errors mean the process could not be
    /// started or waited on; a non-zero exit is a normal result.
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

/// Default backend: a plain child process in its own process group with a cleared
/// environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSandboxBackend;

impl SandboxBackend for NativeSandboxBackend {
    fn name(&self) -> &str {
        "native-process-group"
    }

    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let (program, args) = request
            .command
            .split_first()
            .context("Skill command is empty")?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&request.cwd)
            .env_clear()
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        // Die with the parent even if it is killed outright.
        #[cfg(target_os = "linux")]
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn skill process: {}", program))?;
        tracing::debug!(
            skill_id = %request.skill_id,
            pid = child.id(),
            backend = self.name(),
            "Spawned skill process"
        );

        let writer = child
            .stdin
            .take()
            .map(|stdin| feed_stdin(stdin, request.stdin.clone()));
        let outcome = wait_with_timeout(&mut child, request.timeout)?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        Ok(ExecutionResult {
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
            duration: started.elapsed(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(command: &[&str]) -> ExecutionRequest {
        ExecutionRequest {
            skill_id: "test.skill".into(),
            command: command.iter().map(|s| s.to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: Vec::new(),
            stdin: b"{\"a\":1}\n".to_vec(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_stdin_round_trips_through_cat() {
        let result = NativeSandboxBackend.execute(&request(&["cat"])).unwrap();
        assert_eq!(result.stdout, b"{\"a\":1}\n");
        assert_eq!(result.exit_code, Some(0));
    }

    #[test]
    fn test_environment_is_cleared() {
        let mut req = request(&["/bin/sh", "-c", "echo \"${HOME:-unset}:${ONLY:-unset}\""]);
        req.env = vec![("ONLY".into(), "yes".into())];
        let result = NativeSandboxBackend.execute(&req).unwrap();
        assert_eq!(String::from_utf8_lossy(&result.stdout), "unset:yes\n");
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let err = NativeSandboxBackend
            .execute(&request(&["/definitely/not/a/program"]))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }

    #[test]
    fn test_empty_command_is_an_error() {
        assert!(NativeSandboxBackend.execute(&request(&[])).is_err());
    }
}
