use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum PrepflowError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The backend reported `failed`; the message is the backend's own.
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Job {job_id} completed without `{field}` in its result")]
    MissingDerivedIdentifier { job_id: String, field: &'static str },

    #[error("Cancelled")]
    Cancelled,

    #[error("Job {job_id} did not finish within {timeout:?}")]
    TimedOut { job_id: String, timeout: Duration },

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PrepflowError {
    /// Text recorded in a failed task cell.
    pub fn cell_message(&self) -> String {
        match self {
            PrepflowError::JobFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PrepflowError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failed_message_is_verbatim_in_cells() {
        let err = PrepflowError::JobFailed("renderer timeout".into());
        assert_eq!(err.cell_message(), "renderer timeout");
        assert_eq!(err.to_string(), "Job failed: renderer timeout");
    }

    #[test]
    fn transport_message_is_carried_into_cells() {
        let err = PrepflowError::from(TransportError::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(
            err.cell_message(),
            "Transport error: API error (status 502): bad gateway"
        );
    }

    #[test]
    fn missing_identifier_display() {
        let err = PrepflowError::MissingDerivedIdentifier {
            job_id: "J1".into(),
            field: "core_artifact_id",
        };
        assert_eq!(
            err.to_string(),
            "Job J1 completed without `core_artifact_id` in its result"
        );
    }

    #[test]
    fn timed_out_display() {
        let err = PrepflowError::TimedOut {
            job_id: "J9".into(),
            timeout: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "Job J9 did not finish within 600s");

        let err = PrepflowError::TimedOut {
            job_id: "J".into(),
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Job J did not finish within 1.5s");
        assert!(!err.is_cancelled());
        assert!(PrepflowError::Cancelled.is_cancelled());
    }
}
