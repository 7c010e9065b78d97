//! Polls one job until the backend reports a terminal status.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::error::PrepflowError;
use crate::transport::{JobHandle, JobStatusReport, JobTransport, RemoteStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status fetches.
    pub interval: Duration,
    /// Give up after this long. `None` polls forever.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

/// Poll `handle` until it completes, fails, times out or `cancel` fires.
///
/// Non-terminal reports are handed to `on_progress`; the loop itself never
/// touches orchestrator state. The status fetch and the wait both race the
/// cancellation token, so a cancelled loop returns [`PrepflowError::Cancelled`]
/// without waiting for an in-flight request.
pub async fn poll_until_terminal<F>(
    transport: &dyn JobTransport,
    handle: &JobHandle,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<JobStatusReport, PrepflowError>
where
    F: FnMut(&JobStatusReport),
{
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PrepflowError::Cancelled);
        }

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PrepflowError::Cancelled),
            result = transport.fetch_status(&handle.id) => result?,
        };
        polls += 1;

        match report.status {
            RemoteStatus::Completed => {
                tracing::debug!(job_id = %handle.id, kind = %handle.kind, polls, "Job completed");
                return Ok(report);
            }
            RemoteStatus::Failed => {
                let message = report
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "job failed without an error message".to_string());
                tracing::debug!(job_id = %handle.id, kind = %handle.kind, polls, error = %message, "Job failed");
                return Err(PrepflowError::JobFailed(message));
            }
            RemoteStatus::Pending | RemoteStatus::Running => on_progress(&report),
        }

        if let Some(timeout) = config.timeout {
            if started.elapsed() >= timeout {
                tracing::warn!(job_id = %handle.id, polls, timeout_secs = timeout.as_secs(), "Job poll timed out");
                return Err(PrepflowError::TimedOut {
                    job_id: handle.id.clone(),
                    timeout,
                });
            }
        }

        if cancel.is_cancelled() {
            return Err(PrepflowError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PrepflowError::Cancelled),
            _ = sleep(config.interval) => {}
        }
    }
}
