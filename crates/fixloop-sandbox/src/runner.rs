//! Unit runners: execute one fixture against a candidate in isolation.

use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use fixloop_state::{TestCase, TestResult};

use crate::error::{SandboxError, SandboxResult};
use crate::harness::{parse_output, render_script};

/// One unit of work: a candidate, its entry point and a single fixture.
#[derive(Debug, Clone)]
pub struct UnitJob {
    pub source: Arc<str>,
    pub entry_point: Arc<str>,
    pub case: TestCase,
}

/// Executes a single unit.
///
/// Implementations must not share mutable state between units. The caller
/// enforces timeouts by dropping the returned future, so any spawned
/// resource has to be released on drop.
#[async_trait]
pub trait UnitRunner: Send + Sync + 'static {
    async fn run_unit(&self, job: &UnitJob) -> SandboxResult<TestResult>;
}

/// Runs each unit in a fresh interpreter process.
#[derive(Debug, Clone)]
pub struct PythonProcessRunner {
    interpreter: String,
}

impl PythonProcessRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

impl Default for PythonProcessRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

#[async_trait]
impl UnitRunner for PythonProcessRunner {
    async fn run_unit(&self, job: &UnitJob) -> SandboxResult<TestResult> {
        let start = Instant::now();
        let script = render_script(&job.source, &job.entry_point, &job.case)?;

        let mut file = tempfile::Builder::new()
            .prefix("fixloop-unit-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let child = Command::new(&self.interpreter)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        debug!(
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis() as u64,
            "unit finished"
        );

        let result = match parse_output(&stdout) {
            Some(line) => TestResult {
                input: job.case.input.clone(),
                expected: job.case.expected.clone(),
                actual: line.actual,
                passed: line.passed,
                error: line.error,
            },
            None => {
                let head: String = stdout.chars().take(200).collect();
                TestResult::failed(&job.case, format!("Invalid JSON output: {head}"))
            }
        };
        Ok(result)
    }
}
