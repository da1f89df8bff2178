//! External process execution.
//!
//! Two entry points:
//!
//! - [`execute`] runs a short-lived command to completion with a timeout,
//!   capturing stdout and stderr. Used for probing and version checks.
//! - [`execute_streaming`] runs a long-lived command, feeding each stderr
//!   line to a callback (log tail and progress stream both arrive there) and
//!   honoring a cancellation token. Jobs have no automatic timeout; a hung
//!   child blocks its job until explicit cancellation.
//!
//! Cancellation is a first-class outcome, distinct from failure. For capture
//! commands a [`GracefulStop`] drives the stop sequence through explicit
//! states: running, then stopping (stop bytes written to stdin), then either
//! stopped within the grace period or force-stopped after a kill. The
//! `forced` flag on [`Outcome::Cancelled`] records which exit was taken.
//!
//! Failures carry the child's own diagnostic text, truncated to a bounded
//! tail, never reinterpreted.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use clipforge_core::{Error, Result};

use crate::command::Command;

/// Maximum number of diagnostic lines kept when reporting a failure.
const STDERR_TAIL_LINES: usize = 40;

/// Output captured from a completed short-lived command.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Terminal result of a streaming execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The child exited with status zero.
    Completed,
    /// Cancellation was requested and the child was terminated. `forced` is
    /// false when the child honored a graceful stop within the grace period.
    Cancelled { forced: bool },
}

/// Graceful stop behavior for commands that honor a control character on
/// stdin (screen capture). When cancellation fires, `stdin_bytes` are written
/// and the child is given `grace` to exit before being killed.
#[derive(Debug, Clone)]
pub struct GracefulStop {
    pub stdin_bytes: Vec<u8>,
    pub grace: Duration,
}

impl GracefulStop {
    /// The conventional ffmpeg capture stop: a `q` keypress.
    pub fn capture(grace: Duration) -> Self {
        Self {
            stdin_bytes: b"q\n".to_vec(),
            grace,
        }
    }
}

/// Keep only the last `max_lines` lines of a diagnostic blob.
pub fn bounded_tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

fn spawn_error(cmd: &Command, e: std::io::Error) -> Error {
    Error::tool(cmd.program_name(), format!("failed to spawn: {e}"))
}

/// Execute a command to completion, capturing stdout and stderr.
///
/// # Errors
///
/// Returns a tool error if the process cannot be spawned, exceeds the
/// timeout, or exits non-zero (message includes the stderr tail).
pub async fn execute(cmd: &Command, timeout: Duration) -> Result<ToolOutput> {
    let mut command = tokio::process::Command::new(cmd.program());
    command
        .args(cmd.arg_slice())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| spawn_error(cmd, e))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Error::tool(
                cmd.program_name(),
                format!("I/O error waiting for process: {e}"),
            ))
        }
        // Dropping the cancelled future drops the child, which is killed via
        // kill_on_drop.
        Err(_elapsed) => {
            return Err(Error::tool(
                cmd.program_name(),
                format!("timed out after {timeout:?}"),
            ))
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(Error::tool(
            cmd.program_name(),
            format!(
                "exited with status {}: {}",
                output.status,
                bounded_tail(stderr.trim(), STDERR_TAIL_LINES)
            ),
        ));
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Execute a command, streaming stderr lines to `on_stderr_line` and honoring
/// `cancel`.
///
/// Returns [`Outcome::Completed`] on a zero exit, [`Outcome::Cancelled`] when
/// cancellation was requested (however the child then exited), and a tool
/// error with the bounded stderr tail on a non-zero exit.
pub async fn execute_streaming(
    cmd: &Command,
    cancel: CancellationToken,
    graceful: Option<GracefulStop>,
    mut on_stderr_line: impl FnMut(&str),
) -> Result<Outcome> {
    let mut command = tokio::process::Command::new(cmd.program());
    command
        .args(cmd.arg_slice())
        .stdin(if graceful.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| spawn_error(cmd, e))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Internal("child stderr was not captured".into()))?;
    let mut reader = BufReader::new(stderr).lines();

    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut cancelled = false;

    loop {
        tokio::select! {
            line = reader.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line.clone());
                        on_stderr_line(&line);
                    }
                    // EOF or a broken pipe: the child is exiting.
                    _ => break,
                }
            }
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
        }
    }

    if cancelled {
        let forced = stop_child(&mut child, reader, graceful).await;
        tracing::info!(
            program = %cmd.program_name(),
            forced,
            "child terminated after cancellation"
        );
        return Ok(Outcome::Cancelled { forced });
    }

    let status = child.wait().await?;

    // The stream can end in the same instant the token fires; cancellation
    // still wins over failure classification.
    if cancel.is_cancelled() {
        return Ok(Outcome::Cancelled { forced: false });
    }

    if status.success() {
        Ok(Outcome::Completed)
    } else {
        let tail: Vec<String> = tail.into_iter().collect();
        Err(Error::tool(
            cmd.program_name(),
            format!("exited with status {}: {}", status, tail.join("\n")),
        ))
    }
}

/// Terminate a child after cancellation. Returns true when the kill path was
/// taken (force-stopped), false when the child stopped on its own within the
/// grace period.
async fn stop_child(
    child: &mut tokio::process::Child,
    reader: tokio::io::Lines<BufReader<tokio::process::ChildStderr>>,
    graceful: Option<GracefulStop>,
) -> bool {
    let Some(gs) = graceful else {
        let _ = child.start_kill();
        let _ = child.wait().await;
        return true;
    };

    // Stopping state: write the stop bytes; closing stdin doubles as an EOF
    // signal for tools that stop on it.
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(&gs.stdin_bytes).await;
        let _ = stdin.flush().await;
    }

    // Keep draining stderr so the child cannot block on a full pipe while
    // writing its trailer.
    let mut reader = reader;
    let drain = tokio::spawn(async move { while let Ok(Some(_)) = reader.next_line().await {} });

    let forced = match tokio::time::timeout(gs.grace, child.wait()).await {
        Ok(_) => false,
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            true
        }
    };
    drain.abort();
    forced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[tokio::test]
    async fn execute_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let output = execute(&cmd, Duration::from_secs(5)).await.unwrap();
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn execute_nonexistent_tool_fails() {
        let cmd = Command::new("nonexistent_tool_xyz_12345");
        let result = execute(&cmd, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_nonzero_exit_carries_stderr() {
        let cmd = sh("echo boom 1>&2; exit 3");
        let err = execute(&cmd, Duration::from_secs(5)).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("boom"), "unexpected error: {msg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_timeout_fires() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let err = execute(&cmd, Duration::from_millis(100)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_collects_lines_and_completes() {
        let cmd = sh("echo one 1>&2; echo two 1>&2");
        let mut lines = Vec::new();
        let outcome = execute_streaming(&cmd, CancellationToken::new(), None, |l| {
            lines.push(l.to_string())
        })
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(lines, ["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_failure_includes_tail() {
        let cmd = sh("echo diagnostics 1>&2; exit 2");
        let err = execute_streaming(&cmd, CancellationToken::new(), None, |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("diagnostics"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_cancel_kills_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let start = std::time::Instant::now();
        let outcome = execute_streaming(&cmd, token, None, |_| {}).await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled { forced: true });
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn graceful_stop_within_grace_is_not_forced() {
        // cat exits when its stdin closes after the stop bytes are written.
        let cmd = Command::new("cat");
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let outcome = execute_streaming(
            &cmd,
            token,
            Some(GracefulStop::capture(Duration::from_secs(5))),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Cancelled { forced: false });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn graceful_stop_escalates_to_kill() {
        // sleep ignores stdin, so the grace period elapses and the stop is
        // escalated to a kill.
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let token = CancellationToken::new();
        token.cancel();

        let outcome = execute_streaming(
            &cmd,
            token,
            Some(GracefulStop::capture(Duration::from_millis(100))),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Cancelled { forced: true });
    }

    #[test]
    fn bounded_tail_keeps_last_lines() {
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(bounded_tail(&text, 3), "7\n8\n9");
        assert_eq!(bounded_tail("short", 3), "short");
    }
}
