//! In-memory job tracking.
//!
//! A [`Job`] is one asynchronous unit of work: the built command, the file it
//! reads, the file it writes, and its lifecycle state. Jobs are ephemeral
//! work orders owned exclusively by the [`JobRegistry`]; a restart of the
//! owning process loses them all, by design.
//!
//! Lifecycle: created `pending`, moved to `running` when the child process
//! starts, and terminated in exactly one of `completed`, `failed`, or
//! `cancelled`. Terminal states are never exited. All reads and mutations go
//! through one coarse mutex; an update against an unknown id is a logged
//! no-op, never an implicit insert.

pub mod runner;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use clipforge_av::Command;

/// Lines of child output retained per job.
const LOG_TAIL_LINES: usize = 200;

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// One tracked unit of work.
///
/// `output_file` is only meaningful once `status` is `completed`; readers
/// must not treat a populated path as proof the file exists.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub tool: String,
    pub status: JobStatus,
    /// Monotonically non-decreasing percentage, absent until the first
    /// progress sample (or throughout, when the total duration is unknown).
    pub progress: Option<u8>,
    /// The built argv, for display and re-submission.
    pub cmd: Vec<String>,
    pub input_file: Option<String>,
    pub output_file: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bounded tail of the child's diagnostic output.
    pub log: VecDeque<String>,
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was live and its process has been signalled.
    Requested,
    /// The job had already reached a terminal state; nothing to do.
    AlreadyTerminal,
    NotFound,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    cancels: HashMap<String, CancellationToken>,
}

/// The registry: a single coarse lock over the id-to-job map.
#[derive(Default)]
pub struct JobRegistry {
    inner: Mutex<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `pending` job and return its id together with the
    /// cancellation token the runner must watch. Safe under concurrent
    /// creation.
    pub fn create(
        &self,
        tool: &str,
        cmd: &Command,
        input_file: Option<String>,
    ) -> (String, CancellationToken) {
        let id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();

        let job = Job {
            id: id.clone(),
            tool: tool.to_string(),
            status: JobStatus::Pending,
            progress: None,
            cmd: cmd.argv(),
            input_file,
            output_file: cmd.output().map(|p| p.to_path_buf()),
            error: None,
            created_at: Utc::now(),
            log: VecDeque::new(),
        };

        let mut inner = self.inner.lock();
        inner.cancels.insert(id.clone(), token.clone());
        inner.jobs.insert(id.clone(), job);
        (id, token)
    }

    /// Read-only lookup; absence is a normal outcome.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.inner.lock().jobs.get(id).cloned()
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        let inner = self.inner.lock();
        let mut jobs: Vec<Job> = inner.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Transition `pending` to `running`. Returns false (and changes
    /// nothing) for unknown ids or any other state.
    pub fn mark_running(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Running;
                true
            }
            Some(job) => {
                tracing::debug!("job {id} cannot start from {:?}", job.status);
                false
            }
            None => {
                tracing::debug!("mark_running for unknown job {id}");
                false
            }
        }
    }

    /// Record a progress sample for a running job. Progress only moves
    /// forward.
    pub fn record_progress(&self, id: &str, percent: u8) {
        let mut inner = self.inner.lock();
        if let Some(job) = inner.jobs.get_mut(id) {
            if job.status == JobStatus::Running {
                let percent = percent.min(100);
                job.progress = Some(job.progress.unwrap_or(0).max(percent));
            }
        }
    }

    /// Append a line to the job's bounded log tail.
    pub fn append_log(&self, id: &str, line: &str) {
        let mut inner = self.inner.lock();
        if let Some(job) = inner.jobs.get_mut(id) {
            if job.log.len() == LOG_TAIL_LINES {
                job.log.pop_front();
            }
            job.log.push_back(line.to_string());
        }
    }

    /// Terminal transition to `completed`.
    pub fn complete(&self, id: &str) -> bool {
        self.finish(id, JobStatus::Completed, None)
    }

    /// Terminal transition to `failed` with the diagnostic text.
    pub fn fail(&self, id: &str, error: &str) -> bool {
        self.finish(id, JobStatus::Failed, Some(error.to_string()))
    }

    /// Terminal transition to `cancelled`. Distinct from failure: an exit
    /// caused by an explicit cancel request is not an error.
    pub fn mark_cancelled(&self, id: &str) -> bool {
        self.finish(id, JobStatus::Cancelled, None)
    }

    fn finish(&self, id: &str, status: JobStatus, error: Option<String>) -> bool {
        debug_assert!(status.is_terminal());
        let mut inner = self.inner.lock();
        let Some(job) = inner.jobs.get_mut(id) else {
            tracing::debug!("terminal transition for unknown job {id}");
            return false;
        };
        if job.status.is_terminal() {
            tracing::debug!("job {id} already terminal ({:?})", job.status);
            return false;
        }

        job.status = status;
        job.error = error;
        if status == JobStatus::Completed {
            job.progress = Some(100);
        }
        inner.cancels.remove(id);
        true
    }

    /// Request cancellation. A request against a terminal job is a no-op,
    /// not an error.
    pub fn cancel(&self, id: &str) -> CancelOutcome {
        let inner = self.inner.lock();
        let Some(job) = inner.jobs.get(id) else {
            return CancelOutcome::NotFound;
        };
        if job.status.is_terminal() {
            return CancelOutcome::AlreadyTerminal;
        }
        if let Some(token) = inner.cancels.get(id) {
            token.cancel();
        }
        CancelOutcome::Requested
    }
}
