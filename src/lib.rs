//! Client-side orchestration of ingest and generation jobs.
//!
//! A run submits one ingest job for a source, polls it to completion and then
//! fans out one generation job per [`TargetKind`](transport::TargetKind).
//! Progress is published as [`OrchestratorState`] snapshots.

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod state_machine;
pub mod transport;
pub mod ui;

pub use error::PrepflowError;
pub use orchestrator::{Orchestrator, OrchestratorSettings, Source};
pub use state_machine::{OrchestratorState, TaskSlot, TaskState, TaskStatus};
pub use transport::{HttpJobClient, JobTransport};
