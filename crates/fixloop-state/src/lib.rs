//! fixloop-state: fixtures, results and audit steps for fixloop
//!
//! ## Layer 0 - Data/Persistence
//!
//! Everything the repair loop reads from or writes to lives behind the
//! traits in [`storage_traits`]:
//!
//! - `FixtureRepository`: `JsonFixtureRepository` (files) / `MemoryFixtureRepository`
//! - `ResultStore`: `SurrealResultStore` (SurrealDB) / `MemoryResultStore`
//! - `StepLogger`: `FsStepLogger` (files) / `MemoryStepLogger`

mod error;
pub mod fakes;
pub mod fixtures;
pub mod literal;
pub mod migrations;
mod schema;
pub mod step_log;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fixtures::{JsonFixtureRepository, DEFAULT_YES_NO_PROBLEMS};
pub use literal::{parse_literal, LiteralError, PyLiteral};
pub use schema::{ResultRow, TimeRow};
pub use step_log::FsStepLogger;
pub use storage_traits::{
    AttemptRecord, ContentDigest, FixtureRepository, FixtureSet, GenerationMetric, ResultStore,
    StepKind, StepLogger, StepRecord, StorageResult, TestCase, TestInput, TestResult,
};
pub use surreal_store::SurrealResultStore;

/// Result type for fixloop-state backend setup
pub type Result<T> = std::result::Result<T, StateError>;
