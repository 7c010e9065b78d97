use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{Artifact, RemoteStatus};

/// Lifecycle status of one task cell.
///
/// idle → pending → running → completed, with `failed` reachable from every
/// non-terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Idle,
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Idle => write!(f, "idle"),
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Something that happened to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// About to submit the job.
    Submit,
    /// The backend accepted the job.
    Accepted { job_id: String },
    /// A non-terminal poll result.
    Progress(RemoteStatus),
    Complete {
        artifact_id: String,
        artifact: Option<Artifact>,
    },
    Fail { error: String },
}

impl TaskEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Submit => "submit",
            TaskEvent::Accepted { .. } => "accepted",
            TaskEvent::Progress(_) => "progress",
            TaskEvent::Complete { .. } => "complete",
            TaskEvent::Fail { .. } => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: `{event}` is not allowed from {from}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub event: &'static str,
}

/// Local lifecycle record for one unit of asynchronous work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    pub job_id: Option<String>,
    /// Set only once `completed`.
    pub result_artifact_id: Option<String>,
    /// Best-effort resolved artifact; may stay empty on a completed task.
    pub result_artifact: Option<Artifact>,
    /// Set only once `failed`.
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskState {
    /// A cell that is already `pending`, as the ingest cell is when a run opens.
    pub fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Apply `event` to the cell.
    ///
    /// Terminal cells reject every event; only a reset brings them back.
    pub fn apply(&mut self, event: TaskEvent) -> Result<(), TransitionError> {
        let now = Utc::now();
        let from = self.status;

        match (from, event) {
            (TaskStatus::Idle, TaskEvent::Submit) => {
                self.status = TaskStatus::Pending;
                self.started_at = Some(now);
            }
            (TaskStatus::Pending, TaskEvent::Accepted { job_id }) => {
                self.status = TaskStatus::Running;
                self.job_id = Some(job_id);
            }
            (TaskStatus::Pending | TaskStatus::Running, TaskEvent::Progress(remote)) => {
                if remote == RemoteStatus::Running {
                    self.status = TaskStatus::Running;
                }
                self.last_polled_at = Some(now);
            }
            (
                TaskStatus::Running,
                TaskEvent::Complete {
                    artifact_id,
                    artifact,
                },
            ) => {
                self.status = TaskStatus::Completed;
                self.result_artifact_id = Some(artifact_id);
                self.result_artifact = artifact;
                self.error = None;
                self.finished_at = Some(now);
            }
            (TaskStatus::Idle | TaskStatus::Pending | TaskStatus::Running, TaskEvent::Fail { error }) => {
                self.status = TaskStatus::Failed;
                self.error = Some(error);
                self.result_artifact_id = None;
                self.result_artifact = None;
                self.finished_at = Some(now);
            }
            (from, event) => {
                return Err(TransitionError {
                    from,
                    event: event.name(),
                });
            }
        }

        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
