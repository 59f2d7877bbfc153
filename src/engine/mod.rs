//! Execution engine: chained test runs over a validated workflow sequence.

mod backend;
mod clock;
mod simulator;

pub use backend::{HttpWorkflowBackend, WorkflowBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use simulator::{RunState, Simulator, StepResult, StepStatus};
