//! fixloop-sandbox: run a candidate's entry point against fixtures
//!
//! ## Layer 1 - Execution
//!
//! Every fixture runs in a freshly spawned interpreter process with a hard
//! wall-clock limit. A bounded pool runs units in parallel under a global
//! deadline; results return in submission order together with the set of
//! generalized error classes.
//!
//! # Modules
//!
//! - [`config`]     : `SandboxConfig` (timeouts, pool size, interpreter)
//! - [`harness`]    : unit script rendering and result-line parsing
//! - [`runner`]     : `UnitRunner` trait, `PythonProcessRunner`
//! - [`executor`]   : `SandboxExecutor`, `ExecutionReport`
//! - [`generalize`] : raw error message → error class
//! - [`error`]      : `SandboxError` / `SandboxResult`

pub mod config;
pub mod error;
pub mod executor;
pub mod generalize;
pub mod harness;
pub mod runner;

pub use config::SandboxConfig;
pub use error::{SandboxError, SandboxResult};
pub use executor::{ExecutionReport, SandboxExecutor};
pub use generalize::{error_classes, generalize_error, EXECUTION_TIMEOUT, NAMING_CONFLICT};
pub use runner::{PythonProcessRunner, UnitJob, UnitRunner};
