//! External tool invocation with timeouts and a sanitized environment.
//!
//! Every compiler/lint invocation goes through [`run_tool`]. The contract
//! is deliberately narrow: a non-zero exit status is data, not an error —
//! compilers exit non-zero whenever they have something to report. The only
//! failure mode surfaced to callers is the inability to start the process.
//! Timeouts are handled internally: the child is killed and reaped, and the
//! caller receives an empty stdout, a marker line on stderr, and exit code 1.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default per-invocation timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment overrides applied to every invocation.
///
/// Colored output and backtrace dumps would otherwise leak ANSI sequences
/// and noise into the text the parsers consume.
fn tool_env_overrides() -> &'static [(&'static str, &'static str)] {
    &[
        ("NO_COLOR", "1"),
        ("CLICOLOR", "0"),
        ("CARGO_TERM_COLOR", "never"),
        ("TERM", "dumb"),
        ("RUST_BACKTRACE", "0"),
    ]
}

/// Captured output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl ToolOutput {
    /// True when the tool exited zero without timing out.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Failure to start a tool process.
#[derive(Debug, thiserror::Error)]
#[error("failed to spawn '{program}': {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Runs an external tool, capturing stdout/stderr as raw bytes.
///
/// stdout and stderr are drained on background threads so a child that
/// fills its pipe buffer before exiting cannot deadlock the wait.
pub fn run_tool(
    program: &str,
    args: &[&str],
    working_dir: &Path,
    timeout: Duration,
) -> Result<ToolOutput, SpawnError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in tool_env_overrides() {
        command.env(key, value);
    }

    debug!(program, ?args, dir = %working_dir.display(), "running tool");

    let mut child = command.spawn().map_err(|source| SpawnError {
        program: program.to_string(),
        source,
    })?;

    let stdout_thread = drain_pipe(child.stdout.take());
    let stderr_thread = drain_pipe(child.stderr.take());

    match child.wait_timeout(timeout) {
        Ok(Some(status)) => {
            let stdout = join_drain(stdout_thread);
            let stderr = join_drain(stderr_thread);
            Ok(ToolOutput {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
                timed_out: false,
            })
        }
        Ok(None) => {
            warn!(
                program,
                timeout_secs = timeout.as_secs(),
                "tool timed out, killing process"
            );
            kill_and_reap(&mut child);
            // Return immediately; the drain threads finish on their own
            // once the pipes close and their output is discarded.
            drop(stdout_thread);
            drop(stderr_thread);
            Ok(ToolOutput {
                stdout: Vec::new(),
                stderr: format!(
                    "{program}: timed out after {}s and was killed\n",
                    timeout.as_secs()
                )
                .into_bytes(),
                exit_code: 1,
                timed_out: true,
            })
        }
        Err(err) => {
            warn!(program, error = %err, "failed to wait on tool");
            kill_and_reap(&mut child);
            let _ = join_drain(stdout_thread);
            let _ = join_drain(stderr_thread);
            Ok(ToolOutput {
                stdout: Vec::new(),
                stderr: format!("{program}: wait failed: {err}\n").into_bytes(),
                exit_code: 1,
                timed_out: false,
            })
        }
    }
}

type DrainHandle = Option<std::thread::JoinHandle<Vec<u8>>>;

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> DrainHandle {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(err) = pipe.read_to_end(&mut buf) {
                debug!(error = %err, "pipe read failed");
            }
            buf
        })
    })
}

fn join_drain(handle: DrainHandle) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let output = run_tool(
            "sh",
            &["-c", "echo out; echo err >&2; exit 3"],
            Path::new("."),
            Duration::from_secs(10),
        )
        .expect("sh should spawn");

        assert_eq!(output.exit_code, 3);
        assert!(!output.timed_out);
        assert!(!output.succeeded());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[test]
    fn test_timeout_kills_and_reports_marker() {
        let output = run_tool(
            "sh",
            &["-c", "sleep 30"],
            Path::new("."),
            Duration::from_millis(200),
        )
        .expect("sh should spawn");

        assert!(output.timed_out);
        assert_eq!(output.exit_code, 1);
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("timed out"));
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let result = run_tool(
            "definitely-not-a-real-binary-name",
            &[],
            Path::new("."),
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_reach_the_child() {
        let output = run_tool(
            "sh",
            &["-c", "printf '%s' \"$NO_COLOR-$CARGO_TERM_COLOR\""],
            Path::new("."),
            Duration::from_secs(10),
        )
        .expect("sh should spawn");

        assert_eq!(String::from_utf8_lossy(&output.stdout), "1-never");
    }
}
