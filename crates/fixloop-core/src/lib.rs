//! fixloop-core: validate and repair generated Python
//!
//! ## Layer 2 - Orchestration
//!
//! A generator response flows through:
//!
//! 1. [`extract`]: pull the candidate program out of free-form text
//! 2. [`analyze`]: parse, build the call graph, flag defects, find entry points
//! 3. `fixloop_sandbox::SandboxExecutor`: run the entry point against fixtures
//! 4. [`repair`]: decide the next diagnostic or stop, within a fixed budget
//!
//! Persistence and audit go through the `fixloop_state` traits; the
//! generative model sits behind [`generator::Generator`].

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod metrics;
pub mod obs;
pub mod repair;
pub mod telemetry;

pub use analyze::{
    analyze, Analysis, AnalysisReport, CallGraph, FunctionRecord, IssueTag, StaticAnalyzer,
    SyntaxFailure, SyntaxProvider, TreeSitterPython,
};
pub use config::{FixloopConfig, PathsConfig, RepairConfig};
pub use error::{FixloopError, Result};
pub use extract::{extract, CandidateSource, CODE_NOT_FOUND};
pub use generator::{GenerationContext, Generator, ScriptedGenerator};
pub use repair::{
    AttemptOutcome, BatchReport, ProblemOutcome, ProblemReport, RepairAttempt,
    RepairOrchestrator, RepairState,
};
pub use telemetry::init_tracing;
