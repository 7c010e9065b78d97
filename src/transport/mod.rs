pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

pub use client::{DEFAULT_BASE_URL, HttpJobClient};
pub use error::TransportError;
pub use types::{
    Artifact, ArtifactEdge, ArtifactListing, GeneratePayload, IngestPayload, JobHandle, JobKind,
    JobPayload, JobStatusReport, RemoteStatus, SourceKind, TargetKind,
};

/// Request/response primitives against the remote job API.
///
/// Implementations hold no state between calls and never retry.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// Create a job and return its identifier.
    async fn submit(&self, project_id: &str, payload: &JobPayload) -> Result<String, TransportError>;

    /// Fetch the current status of a job.
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport, TransportError>;

    /// List every artifact of a project. Used to resolve generated artifacts.
    async fn list_artifacts(&self, project_id: &str) -> Result<ArtifactListing, TransportError>;
}
