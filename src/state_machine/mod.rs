mod aggregate;
mod task;

pub use aggregate::{OrchestratorState, TaskSlot};
pub use task::{TaskEvent, TaskState, TaskStatus, TransitionError};
