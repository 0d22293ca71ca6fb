//! Common utilities for skill processes
//!
//! Stream draining, the timeout watchdog and process-group cleanup shared by sandbox
//! backends.

use anyhow::Result;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Watchdog poll interval in milliseconds. Keeps timeout detection well under 10 ms late.
pub const WATCHDOG_POLL_INTERVAL_MS: u64 = 5;

/// Outcome of waiting on a child process.
#[derive(Debug)]
pub struct WaitOutcome {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was killed (timeout) or ended by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Kill every process in the group led by `pid`. Missing groups are ignored.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else { return };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "killpg failed"),
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(_pid: u32) {}

/// Kills the child's process group if dropped while still armed, so an unwinding parent
/// never leaves a skill running.
pub struct ProcessGroupGuard {
    pid: u32,
    armed: bool,
}

impl ProcessGroupGuard {
    pub fn new(pid: u32) -> Self {
        Self { pid, armed: true }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.armed {
            kill_process_group(self.pid);
        }
    }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf) {
            tracing::debug!(error = %e, bytes = buf.len(), "Failed to drain skill output stream");
        }
        buf
    })
}

/// Feed stdin from a thread so a child that never reads cannot block the watchdog.
/// A child exiting early closes the pipe; the resulting BrokenPipe is expected.
pub fn feed_stdin(mut stdin: ChildStdin, input: Vec<u8>) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(&input) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                tracing::debug!(error = %e, "Failed to write skill stdin");
            }
        }
        // dropping stdin closes the pipe so the child sees EOF
    })
}

fn join_bytes(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.map(|h| h.join().unwrap_or_default()).unwrap_or_default()
}

/// Wait for a child with a wall-clock timeout.
///
/// Reads stdout/stderr in background threads while the process runs; without this a child
/// writing more than a pipe buffer would block and never exit. On timeout the whole process
/// group is killed and the child reaped before returning. After a normal exit, stragglers
/// left in the group are killed too so they cannot hold the pipes open.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<WaitOutcome> {
    let start = Instant::now();
    let poll = Duration::from_millis(WATCHDOG_POLL_INTERVAL_MS);
    let pid = child.id();
    let mut guard = ProcessGroupGuard::new(pid);

    let stdout_handle = child.stdout.take().map(drain);
    let stderr_handle = child.stderr.take().map(drain);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                kill_process_group(pid);
                guard.disarm();
                return Ok(WaitOutcome {
                    stdout: join_bytes(stdout_handle),
                    stderr: join_bytes(stderr_handle),
                    exit_code: status.code(),
                    timed_out: false,
                });
            }
            Ok(None) => {}
            Err(e) => {
                // guard kills the group on return
                return Err(anyhow::anyhow!("Failed to wait for process: {}", e));
            }
        }

        if start.elapsed() >= timeout {
            kill_process_group(pid);
            let _ = child.kill();
            let _ = child.wait();
            guard.disarm();
            return Ok(WaitOutcome {
                stdout: join_bytes(stdout_handle),
                stderr: join_bytes(stderr_handle),
                exit_code: None,
                timed_out: true,
            });
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        thread::sleep(poll.min(remaining).max(Duration::from_millis(1)));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};

    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .unwrap()
    }

    #[test]
    fn test_captures_streams_and_exit_code() {
        let mut child = spawn_sh("cat; echo err >&2; exit 3");
        let stdin = child.stdin.take().unwrap();
        feed_stdin(stdin, b"hello".to_vec()).join().unwrap();
        let out = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout, b"hello");
        assert_eq!(out.stderr, b"err\n");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.timed_out);
    }

    #[test]
    fn test_timeout_kills_and_reports_no_exit_code() {
        let mut child = spawn_sh("sleep 5");
        let started = Instant::now();
        let out = wait_with_timeout(&mut child, Duration::from_millis(50)).unwrap();
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn test_background_grandchild_does_not_hang_wait() {
        let mut child = spawn_sh("sleep 5 & echo done");
        let started = Instant::now();
        let out = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout, b"done\n");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::other("pipe reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"part");
            Ok(4)
        }
    }

    #[test]
    fn test_drain_keeps_bytes_read_before_error() {
        let out = drain(FailingReader { sent: false }).join().unwrap();
        assert_eq!(out, b"part");
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let mut child = spawn_sh("head -c 200000 /dev/zero");
        let out = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout.len(), 200_000);
        assert_eq!(out.exit_code, Some(0));
    }
}
