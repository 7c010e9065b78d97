use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PrepflowError;
use crate::poller::{PollConfig, poll_until_terminal};
use crate::state_machine::{OrchestratorState, TaskEvent, TaskSlot};
use crate::transport::{
    Artifact, GeneratePayload, IngestPayload, JobHandle, JobPayload, JobTransport, SourceKind,
    TargetKind,
};

pub const DEFAULT_DISPLAY_NAME: &str = "Untitled";

/// What the user asked to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    /// URL or uploaded file path.
    pub reference: String,
    pub display_name: String,
}

impl Source {
    pub fn new(kind: SourceKind, reference: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            display_name
        };
        Self {
            kind,
            reference: reference.into(),
            display_name,
        }
    }

    fn ingest_payload(&self) -> JobPayload {
        JobPayload::Ingest(IngestPayload {
            source_type: self.kind,
            source_ref: self.reference.clone(),
            original_name: self.display_name.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub project_id: String,
    pub poll: PollConfig,
}

// Scope of the current run. Updates carrying another epoch, or arriving after
// the token fired, are dropped.
struct RunScope {
    epoch: u64,
    cancel: CancellationToken,
}

struct Inner {
    transport: Arc<dyn JobTransport>,
    settings: OrchestratorSettings,
    scope: Mutex<RunScope>,
    state: watch::Sender<OrchestratorState>,
}

/// Drives the ingest → fan-out generate workflow and owns its state.
///
/// Cloning is cheap and every clone drives the same state, so a caller can
/// spawn [`Orchestrator::run`] and keep a handle for `cancel`/`reset`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn JobTransport>, settings: OrchestratorSettings) -> Self {
        let (state, _) = watch::channel(OrchestratorState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                scope: Mutex::new(RunScope {
                    epoch: 0,
                    cancel: CancellationToken::new(),
                }),
                state,
            }),
        }
    }

    /// Current aggregate state.
    pub fn snapshot(&self) -> OrchestratorState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every applied state change.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().is_running()
    }

    pub fn all_done(&self) -> bool {
        self.inner.state.borrow().all_done()
    }

    /// Process `source`: ingest it, then generate every target from the result.
    ///
    /// Replaces any previous run. Ingest failures abort the run and are
    /// returned; generation failures only fail their own cell and the run
    /// still resolves to the final snapshot.
    pub async fn run(&self, source: Source) -> Result<OrchestratorState, PrepflowError> {
        let (epoch, cancel) = self.begin_run();
        tracing::info!(
            epoch,
            source_type = %source.kind,
            source_ref = %source.reference,
            name = %source.display_name,
            "Run started",
        );

        let core_artifact_id = match self.run_ingest(epoch, &cancel, &source).await {
            Ok(id) => id,
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(epoch, "Run cancelled during ingest");
                } else {
                    self.update(epoch, TaskSlot::Ingest, TaskEvent::Fail { error: e.cell_message() });
                    tracing::error!(epoch, error = %e, "Ingest failed, no generation started");
                }
                return Err(e);
            }
        };

        self.fan_out(epoch, &cancel, &core_artifact_id).await;

        if cancel.is_cancelled() || !self.is_current(epoch) {
            tracing::info!(epoch, "Run cancelled before all generation tasks finished");
            return Err(PrepflowError::Cancelled);
        }

        let state = self.snapshot();
        tracing::info!(
            epoch,
            all_done = state.all_done(),
            failed = ?state.failed_targets(),
            "Run finished",
        );
        Ok(state)
    }

    /// Stop every polling loop of the current run. Cells keep their last status.
    ///
    /// A finished run is left untouched.
    pub fn cancel(&self) {
        let scope = self.lock_scope();
        scope.cancel.cancel();
        self.inner.state.send_if_modified(|state| {
            let changed = state.is_running();
            if changed {
                state.cancelled = true;
            }
            changed
        });
        tracing::info!(epoch = scope.epoch, "Run cancelled");
    }

    /// Cancel, then return every cell to idle.
    pub fn reset(&self) {
        let mut scope = self.lock_scope();
        scope.cancel.cancel();
        scope.epoch += 1;
        scope.cancel = CancellationToken::new();
        self.inner.state.send_replace(OrchestratorState::default());
        tracing::debug!(epoch = scope.epoch, "State reset");
    }

    fn lock_scope(&self) -> MutexGuard<'_, RunScope> {
        self.inner.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock_scope().epoch == epoch
    }

    // Cancels the previous run, opens a new scope and publishes fresh state.
    fn begin_run(&self) -> (u64, CancellationToken) {
        let mut scope = self.lock_scope();
        scope.cancel.cancel();
        scope.epoch += 1;
        scope.cancel = CancellationToken::new();
        self.inner
            .state
            .send_replace(OrchestratorState::for_run(Uuid::new_v4()));
        (scope.epoch, scope.cancel.clone())
    }

    /// Apply `event` to `slot` if the run identified by `epoch` is still live.
    ///
    /// This is the only path that mutates cells. The scope lock is held while
    /// the state is modified, so an update can never land after a `cancel`,
    /// `reset` or `run` that started before it.
    fn update(&self, epoch: u64, slot: TaskSlot, event: TaskEvent) -> bool {
        let scope = self.lock_scope();
        if scope.epoch != epoch || scope.cancel.is_cancelled() {
            tracing::debug!(epoch, current = scope.epoch, %slot, event = event.name(), "Dropping stale update");
            return false;
        }

        self.inner.state.send_if_modified(|state| {
            match state.cell_mut(slot).apply(event) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(epoch, %slot, error = %e, "Rejected task transition");
                    false
                }
            }
        })
    }

    async fn submit(
        &self,
        cancel: &CancellationToken,
        payload: JobPayload,
    ) -> Result<JobHandle, PrepflowError> {
        let project_id = &self.inner.settings.project_id;
        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PrepflowError::Cancelled),
            result = self.inner.transport.submit(project_id, &payload) => result?,
        };
        Ok(JobHandle::new(job_id, payload))
    }

    async fn run_ingest(
        &self,
        epoch: u64,
        cancel: &CancellationToken,
        source: &Source,
    ) -> Result<String, PrepflowError> {
        let handle = self.submit(cancel, source.ingest_payload()).await?;
        tracing::info!(epoch, job_id = %handle.id, "Ingest job submitted");
        self.update(
            epoch,
            TaskSlot::Ingest,
            TaskEvent::Accepted {
                job_id: handle.id.clone(),
            },
        );

        let report = poll_until_terminal(
            self.inner.transport.as_ref(),
            &handle,
            &self.inner.settings.poll,
            cancel,
            |r| {
                self.update(epoch, TaskSlot::Ingest, TaskEvent::Progress(r.status));
            },
        )
        .await?;

        let core_artifact_id = report
            .core_artifact_id()
            .map(str::to_string)
            .ok_or_else(|| PrepflowError::MissingDerivedIdentifier {
                job_id: handle.id.clone(),
                field: "core_artifact_id",
            })?;

        self.update(
            epoch,
            TaskSlot::Ingest,
            TaskEvent::Complete {
                artifact_id: core_artifact_id.clone(),
                artifact: None,
            },
        );
        tracing::info!(epoch, job_id = %handle.id, core_artifact_id = %core_artifact_id, "Ingest completed");
        Ok(core_artifact_id)
    }

    // Launches one branch per target and joins them all. Branches never
    // observe each other's outcome.
    async fn fan_out(&self, epoch: u64, cancel: &CancellationToken, core_artifact_id: &str) {
        let mut branches = JoinSet::new();

        for target in TargetKind::ALL {
            let this = self.clone();
            let cancel = cancel.clone();
            let core_artifact_id = core_artifact_id.to_string();
            branches.spawn(async move {
                let slot = TaskSlot::Generation(target);
                let outcome = this
                    .run_generation(epoch, &cancel, target, &core_artifact_id)
                    .await;
                if let Err(e) = &outcome {
                    if !e.is_cancelled() {
                        this.update(epoch, slot, TaskEvent::Fail { error: e.cell_message() });
                    }
                }
                (target, outcome)
            });
        }

        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((target, Ok(artifact_id))) => {
                    tracing::info!(epoch, %target, artifact_id = %artifact_id, "Generation completed");
                }
                Ok((target, Err(PrepflowError::Cancelled))) => {
                    tracing::debug!(epoch, %target, "Generation branch cancelled");
                }
                Ok((target, Err(e))) => {
                    tracing::warn!(epoch, %target, error = %e, "Generation failed");
                }
                Err(e) => {
                    tracing::error!(epoch, error = %e, "Generation branch panicked");
                }
            }
        }
    }

    async fn run_generation(
        &self,
        epoch: u64,
        cancel: &CancellationToken,
        target: TargetKind,
        core_artifact_id: &str,
    ) -> Result<String, PrepflowError> {
        let slot = TaskSlot::Generation(target);
        if !self.update(epoch, slot, TaskEvent::Submit) {
            return Err(PrepflowError::Cancelled);
        }

        let payload = JobPayload::Generate(GeneratePayload {
            source_artifact_id: core_artifact_id.to_string(),
            target_type: target,
        });
        let handle = self.submit(cancel, payload).await?;
        tracing::debug!(epoch, %target, job_id = %handle.id, "Generation job submitted");
        self.update(
            epoch,
            slot,
            TaskEvent::Accepted {
                job_id: handle.id.clone(),
            },
        );

        let report = poll_until_terminal(
            self.inner.transport.as_ref(),
            &handle,
            &self.inner.settings.poll,
            cancel,
            |r| {
                self.update(epoch, slot, TaskEvent::Progress(r.status));
            },
        )
        .await?;

        let artifact_id = report
            .artifact_id()
            .map(str::to_string)
            .ok_or_else(|| PrepflowError::MissingDerivedIdentifier {
                job_id: handle.id.clone(),
                field: "artifact_id",
            })?;

        let artifact = self.resolve_artifact(cancel, target, &artifact_id).await?;
        self.update(
            epoch,
            slot,
            TaskEvent::Complete {
                artifact_id: artifact_id.clone(),
                artifact,
            },
        );
        Ok(artifact_id)
    }

    /// Best-effort lookup of a generated artifact; misses and errors yield `None`.
    async fn resolve_artifact(
        &self,
        cancel: &CancellationToken,
        target: TargetKind,
        artifact_id: &str,
    ) -> Result<Option<Artifact>, PrepflowError> {
        let project_id = &self.inner.settings.project_id;
        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PrepflowError::Cancelled),
            result = self.inner.transport.list_artifacts(project_id) => result,
        };

        match listing {
            Ok(listing) => {
                let artifact = listing.find(artifact_id).cloned();
                if artifact.is_none() {
                    tracing::warn!(%target, artifact_id, "Generated artifact not found in project listing");
                }
                Ok(artifact)
            }
            Err(e) => {
                tracing::warn!(%target, artifact_id, error = %e, "Could not resolve generated artifact");
                Ok(None)
            }
        }
    }
}
