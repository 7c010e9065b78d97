//! Scripted in-memory transport for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

use super::JobTransport;
use super::error::TransportError;
use super::types::{
    Artifact, ArtifactListing, GeneratePayload, JobPayload, JobStatusReport, RemoteStatus,
    TargetKind,
};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Report(JobStatusReport),
    Error(u16, String),
    /// Blocks the status call until [`MockTransport::release_gate`], then reports.
    Gate(JobStatusReport),
}

pub(crate) fn running() -> Step {
    Step::Report(JobStatusReport::with_status(RemoteStatus::Running))
}

pub(crate) fn ingest_done(core_artifact_id: &str) -> Step {
    Step::Report(JobStatusReport::completed(
        json!({"source_artifact_id": "src-1", "core_artifact_id": core_artifact_id}),
    ))
}

pub(crate) fn generate_done(artifact_id: &str) -> Step {
    Step::Report(JobStatusReport::completed(json!({"artifact_id": artifact_id})))
}

pub(crate) fn failed(message: &str) -> Step {
    Step::Report(JobStatusReport::failed(message))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ScriptKey {
    /// Keyed by `source_ref` so concurrent runs can be told apart.
    Ingest(String),
    Generate(TargetKind),
}

impl ScriptKey {
    fn of(payload: &JobPayload) -> Self {
        match payload {
            JobPayload::Ingest(p) => ScriptKey::Ingest(p.source_ref.clone()),
            JobPayload::Generate(p) => ScriptKey::Generate(p.target_type),
        }
    }

    fn default_steps(&self) -> Vec<Step> {
        match self {
            ScriptKey::Ingest(source_ref) => vec![running(), ingest_done(&format!("core-{source_ref}"))],
            ScriptKey::Generate(target) => vec![running(), generate_done(&format!("{target}-artifact"))],
        }
    }
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<ScriptKey, Vec<Step>>,
    submit_errors: HashSet<ScriptKey>,
    jobs: HashMap<String, (ScriptKey, usize)>,
    submitted: Vec<JobPayload>,
    artifacts: Option<ArtifactListing>,
    artifacts_fail: bool,
    status_calls: usize,
}

pub(crate) struct MockTransport {
    state: Mutex<MockState>,
    gate: Semaphore,
    gated: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            gate: Semaphore::new(0),
            gated: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script(mut self, key: ScriptKey, steps: Vec<Step>) -> Self {
        self.state.get_mut().unwrap().scripts.insert(key, steps);
        self
    }

    pub(crate) fn script_ingest(self, source_ref: &str, steps: Vec<Step>) -> Self {
        self.script(ScriptKey::Ingest(source_ref.to_string()), steps)
    }

    pub(crate) fn script_target(self, target: TargetKind, steps: Vec<Step>) -> Self {
        self.script(ScriptKey::Generate(target), steps)
    }

    pub(crate) fn fail_submit(mut self, key: ScriptKey) -> Self {
        self.state.get_mut().unwrap().submit_errors.insert(key);
        self
    }

    pub(crate) fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.state.get_mut().unwrap().artifacts = Some(ArtifactListing {
            artifacts,
            edges: Vec::new(),
        });
        self
    }

    pub(crate) fn fail_artifacts(mut self) -> Self {
        self.state.get_mut().unwrap().artifacts_fail = true;
        self
    }

    pub(crate) fn submitted(&self) -> Vec<JobPayload> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn generate_submissions(&self) -> Vec<GeneratePayload> {
        self.submitted()
            .into_iter()
            .filter_map(|payload| match payload {
                JobPayload::Generate(p) => Some(p),
                JobPayload::Ingest(_) => None,
            })
            .collect()
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    /// Number of status calls that reached the gate. Calls dropped while
    /// parked (cancelled loops) are never subtracted.
    pub(crate) fn gated(&self) -> usize {
        self.gated.load(Ordering::SeqCst)
    }

    pub(crate) fn release_gate(&self) {
        self.gate.add_permits(1024);
    }
}

#[async_trait]
impl JobTransport for MockTransport {
    async fn submit(&self, _project_id: &str, payload: &JobPayload) -> Result<String, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(payload.clone());

        let key = ScriptKey::of(payload);
        if state.submit_errors.contains(&key) {
            return Err(TransportError::Api {
                status: 500,
                message: "submission rejected".into(),
            });
        }

        let job_id = match &key {
            ScriptKey::Ingest(source_ref) => format!("ingest-{source_ref}-{}", state.submitted.len()),
            ScriptKey::Generate(target) => format!("{target}-{}", state.submitted.len()),
        };
        state.jobs.insert(job_id.clone(), (key, 0));
        Ok(job_id)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport, TransportError> {
        let step = {
            let mut state = self.state.lock().unwrap();
            state.status_calls += 1;
            let (key, cursor) = state
                .jobs
                .get(job_id)
                .cloned()
                .ok_or_else(|| TransportError::Api {
                    status: 404,
                    message: format!("Job not found: {job_id}"),
                })?;
            let steps = state
                .scripts
                .get(&key)
                .cloned()
                .unwrap_or_else(|| key.default_steps());
            let step = steps[cursor.min(steps.len() - 1)].clone();
            state.jobs.insert(job_id.to_string(), (key, cursor + 1));
            step
        };

        match step {
            Step::Report(report) => Ok(report),
            Step::Error(status, message) => Err(TransportError::Api { status, message }),
            Step::Gate(report) => {
                self.gated.fetch_add(1, Ordering::SeqCst);
                let _permit = self.gate.acquire().await.unwrap();
                self.gated.fetch_sub(1, Ordering::SeqCst);
                Ok(report)
            }
        }
    }

    async fn list_artifacts(&self, _project_id: &str) -> Result<ArtifactListing, TransportError> {
        let state = self.state.lock().unwrap();
        if state.artifacts_fail {
            return Err(TransportError::Api {
                status: 500,
                message: "artifact listing unavailable".into(),
            });
        }
        Ok(state.artifacts.clone().unwrap_or_default())
    }
}
