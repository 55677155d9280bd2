//! Bounded repair loop: state machine, diagnostics and the orchestrator.

pub mod diagnostics;
mod orchestrator;
pub mod state;

pub use orchestrator::{
    attempt_tag, AttemptOutcome, BatchReport, ProblemOutcome, ProblemReport, RepairAttempt,
    RepairOrchestrator,
};
pub use state::{transition, AttemptBudget, RepairEvent, RepairState};
