//! Asynchronous job execution.
//!
//! One [`run_job`] task is spawned per submitted job; there is no worker
//! pool and no admission control. The task marks the job running, probes the
//! input duration so progress can be computed, streams the child's output
//! into the registry, and classifies the terminal state: exit zero is
//! `completed`, an explicitly requested cancel is `cancelled` (never
//! conflated with failure), anything else is `failed` with the diagnostic
//! tail attached. Nothing is retried; a failed run requires explicit
//! re-submission.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use clipforge_av::exec::{self, GracefulStop, Outcome};
use clipforge_av::probe;
use clipforge_av::toolbox::ToolSpec;
use clipforge_av::{Command, ProgressParser};

use super::JobRegistry;

/// Timeout for non-streaming commands (the metadata probe tool).
const SHORT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Keys of the machine-readable progress stream; kept out of the job log so
/// the tail stays readable.
pub fn is_progress_key_line(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame=",
        "fps=",
        "stream_0",
        "bitrate=",
        "total_size=",
        "out_time",
        "dup_frames=",
        "drop_frames=",
        "speed=",
        "progress=",
    ];
    KEYS.iter().any(|k| line.starts_with(k))
}

/// Execute a job to its terminal state.
///
/// `cmd` is the command to execute (already wrapped with the progress stream
/// flags when the tool reports progress); the argv recorded on the job stays
/// the builder's output.
pub async fn run_job(
    registry: Arc<JobRegistry>,
    ffprobe: Option<PathBuf>,
    spec: &'static ToolSpec,
    job_id: String,
    cmd: Command,
    token: CancellationToken,
    graceful: Option<GracefulStop>,
) {
    if !registry.mark_running(&job_id) {
        return;
    }
    registry.append_log(&job_id, &format!("$ {}", cmd.display()));

    if !spec.reports_progress {
        run_short(&registry, &job_id, &cmd).await;
        return;
    }

    // Total duration feeds the percentage; when it cannot be determined the
    // percentage stays unreported.
    let input = registry.get(&job_id).and_then(|j| j.input_file);
    let total_secs = match (&ffprobe, &input) {
        (Some(ffprobe), Some(input)) => {
            probe::media_duration(ffprobe, std::path::Path::new(input)).await
        }
        _ => None,
    };

    let mut parser = ProgressParser::new(total_secs);
    let reg = Arc::clone(&registry);
    let id = job_id.clone();

    let result = exec::execute_streaming(&cmd, token, graceful, |line| {
        if let Some(update) = parser.feed(line) {
            if let Some(percent) = update.percent {
                reg.record_progress(&id, percent);
            }
        }
        if !is_progress_key_line(line) {
            reg.append_log(&id, line);
        }
    })
    .await;

    match result {
        Ok(Outcome::Completed) => {
            registry.complete(&job_id);
            tracing::info!(job_id = %job_id, tool = spec.id, "job completed");
        }
        Ok(Outcome::Cancelled { forced }) => {
            registry.append_log(
                &job_id,
                if forced {
                    "stop escalated to kill"
                } else {
                    "stopped gracefully"
                },
            );
            registry.mark_cancelled(&job_id);
            tracing::info!(job_id = %job_id, tool = spec.id, forced, "job cancelled");
        }
        Err(e) => {
            let message = e.to_string();
            registry.fail(&job_id, &message);
            tracing::warn!(job_id = %job_id, tool = spec.id, error = %message, "job failed");
        }
    }
}

/// Non-streaming path for tools whose result is their stdout.
async fn run_short(registry: &JobRegistry, job_id: &str, cmd: &Command) {
    match exec::execute(cmd, SHORT_COMMAND_TIMEOUT).await {
        Ok(output) => {
            for line in output.stdout.lines() {
                registry.append_log(job_id, line);
            }
            registry.complete(job_id);
        }
        Err(e) => {
            registry.fail(job_id, &e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use clipforge_av::toolbox;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    fn streaming_spec() -> &'static ToolSpec {
        toolbox::find("webopt").unwrap()
    }

    async fn run_to_terminal(
        spec: &'static ToolSpec,
        cmd: Command,
        cancel_after: Option<Duration>,
    ) -> (Arc<JobRegistry>, String) {
        let registry = Arc::new(JobRegistry::new());
        let (job_id, token) = registry.create(spec.id, &cmd, None);

        if let Some(delay) = cancel_after {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                token.cancel();
            });
        }

        run_job(
            Arc::clone(&registry),
            None,
            spec,
            job_id.clone(),
            cmd,
            token,
            None,
        )
        .await;
        (registry, job_id)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_completes() {
        let (registry, id) = run_to_terminal(streaming_spec(), sh("true"), None).await;
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, Some(100));
        assert!(job.error.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_run_records_diagnostics() {
        let (registry, id) =
            run_to_terminal(streaming_spec(), sh("echo broken 1>&2; exit 2"), None).await;
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let error = job.error.unwrap();
        assert!(error.contains("broken"), "error was: {error}");
        assert!(job.log.iter().any(|l| l.contains("broken")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_run_is_not_a_failure() {
        let (registry, id) = run_to_terminal(
            streaming_spec(),
            sh("sleep 10"),
            Some(Duration::from_millis(50)),
        )
        .await;
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.error.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn short_command_captures_stdout() {
        let spec = toolbox::find("info").unwrap();
        let (registry, id) = run_to_terminal(spec, sh("echo '{\"streams\":[]}'"), None).await;
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.log.iter().any(|l| l.contains("streams")));
    }

    #[test]
    fn progress_lines_are_filtered_from_log() {
        assert!(is_progress_key_line("out_time_us=1000"));
        assert!(is_progress_key_line("progress=continue"));
        assert!(is_progress_key_line("speed=1.5x"));
        assert!(!is_progress_key_line("Press [q] to stop"));
        assert!(!is_progress_key_line("[libx264 @ 0x0] frame I:12"));
    }
}
