use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{TaskState, TaskStatus};
use crate::transport::TargetKind;

/// Addresses one cell of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    Ingest,
    Generation(TargetKind),
}

impl fmt::Display for TaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSlot::Ingest => write!(f, "ingest"),
            TaskSlot::Generation(target) => write!(f, "generate:{target}"),
        }
    }
}

/// One ingest cell plus one cell per generation target.
///
/// Every derived flag is computed from the cells on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub run_id: Option<Uuid>,
    pub ingest: TaskState,
    pub generation: BTreeMap<TargetKind, TaskState>,
    /// Set by `cancel`; cells keep whatever status they last reported.
    pub cancelled: bool,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            run_id: None,
            ingest: TaskState::default(),
            generation: TargetKind::ALL
                .into_iter()
                .map(|target| (target, TaskState::default()))
                .collect(),
            cancelled: false,
        }
    }
}

impl OrchestratorState {
    /// Fresh state for a new run: everything idle except the ingest cell.
    pub fn for_run(run_id: Uuid) -> Self {
        Self {
            run_id: Some(run_id),
            ingest: TaskState::pending(),
            ..Self::default()
        }
    }

    pub fn cell(&self, slot: TaskSlot) -> Option<&TaskState> {
        match slot {
            TaskSlot::Ingest => Some(&self.ingest),
            TaskSlot::Generation(target) => self.generation.get(&target),
        }
    }

    pub fn cell_mut(&mut self, slot: TaskSlot) -> &mut TaskState {
        match slot {
            TaskSlot::Ingest => &mut self.ingest,
            TaskSlot::Generation(target) => self.generation.entry(target).or_default(),
        }
    }

    /// True iff ingest completed and every generation cell is terminal.
    pub fn all_done(&self) -> bool {
        self.ingest.status == TaskStatus::Completed
            && TargetKind::ALL.iter().all(|target| {
                self.generation
                    .get(target)
                    .is_some_and(|cell| cell.status.is_terminal())
            })
    }

    /// True while some cell is pending or running and the run was not cancelled.
    pub fn is_running(&self) -> bool {
        !self.cancelled
            && (self.ingest.status.is_in_flight()
                || self.generation.values().any(|cell| cell.status.is_in_flight()))
    }

    pub fn failed_targets(&self) -> Vec<TargetKind> {
        self.generation
            .iter()
            .filter(|(_, cell)| cell.status == TaskStatus::Failed)
            .map(|(target, _)| *target)
            .collect()
    }
}
