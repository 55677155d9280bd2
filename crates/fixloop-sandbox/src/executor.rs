//! Bounded-parallel fixture executor.
//!
//! Units run on a `JoinSet` gated by a `Semaphore`. Each unit gets a hard
//! per-test timeout; the whole run is bounded by a global deadline after
//! which every outstanding unit is aborted. Neither timeout raises to the
//! caller. Results always come back in submission order.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{info, warn};

use fixloop_state::{TestCase, TestResult};

use crate::config::SandboxConfig;
use crate::generalize::{error_classes, EXECUTION_TIMEOUT};
use crate::runner::{PythonProcessRunner, UnitJob, UnitRunner};

/// Ordered results of one run plus the distinct error classes they carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub results: Vec<TestResult>,
    pub error_classes: BTreeSet<String>,
}

impl ExecutionReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

/// Aborts the wrapped task when dropped, so abandoning a unit also tears
/// down its child process.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs a candidate's entry point against fixtures.
///
/// Stateless between calls; one executor can serve any number of runs.
pub struct SandboxExecutor<R: UnitRunner = PythonProcessRunner> {
    runner: Arc<R>,
    config: SandboxConfig,
}

impl SandboxExecutor<PythonProcessRunner> {
    /// Executor spawning `config.interpreter` for every unit.
    pub fn python(config: SandboxConfig) -> Self {
        let runner = PythonProcessRunner::new(config.interpreter.clone());
        Self::new(runner, config)
    }
}

impl<R: UnitRunner> SandboxExecutor<R> {
    pub fn new(runner: R, config: SandboxConfig) -> Self {
        Self {
            runner: Arc::new(runner),
            config,
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run with the configured per-test timeout.
    pub async fn run(&self, source: &str, entry_point: &str, tests: &[TestCase]) -> ExecutionReport {
        self.run_with_timeout(source, entry_point, tests, self.config.per_test_timeout())
            .await
    }

    pub async fn run_with_timeout(
        &self,
        source: &str,
        entry_point: &str,
        tests: &[TestCase],
        per_test: Duration,
    ) -> ExecutionReport {
        let n = tests.len();
        if n == 0 {
            return ExecutionReport::default();
        }

        let workers = self.config.pool_size(n);
        let deadline = Instant::now() + self.config.global_deadline(n, per_test);
        info!(cases = n, workers, "Evaluating cases");

        let source: Arc<str> = Arc::from(source);
        let entry_point: Arc<str> = Arc::from(entry_point);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut set = JoinSet::new();

        for (idx, case) in tests.iter().cloned().enumerate() {
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);
            let job = UnitJob {
                source: Arc::clone(&source),
                entry_point: Arc::clone(&entry_point),
                case,
            };
            set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (idx, TestResult::failed(&job.case, format!("Executor failed: {e}")));
                    }
                };
                (idx, run_one(runner, job, per_test).await)
            });
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; n];
        let mut deadline_hit = false;
        loop {
            let next = tokio::time::timeout_at(deadline, set.join_next()).await;
            match next {
                Ok(Some(Ok((idx, result)))) => slots[idx] = Some(result),
                Ok(Some(Err(e))) => warn!(error = %e, "sandbox task failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(outstanding = set.len(), "global deadline reached, aborting units");
                    set.abort_all();
                    deadline_hit = true;
                    break;
                }
            }
        }

        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(tests)
            .map(|(slot, case)| {
                slot.unwrap_or_else(|| {
                    if deadline_hit {
                        TestResult::failed(case, EXECUTION_TIMEOUT)
                    } else {
                        TestResult::failed(case, "Executor failed: unit task terminated")
                    }
                })
            })
            .collect();

        let error_classes = error_classes(&results);
        let passed = results.iter().filter(|r| r.passed).count();
        info!(total = n, passed, error_classes = error_classes.len(), "All tests processed");

        ExecutionReport {
            results,
            error_classes,
        }
    }
}

/// Run one unit under its own timeout. Panics and runner errors become
/// `Executor failed` results; an expired timeout becomes the canonical
/// timeout result.
async fn run_one<R: UnitRunner>(runner: Arc<R>, job: UnitJob, per_test: Duration) -> TestResult {
    let case = job.case.clone();
    let mut handle = AbortOnDrop(tokio::spawn(async move { runner.run_unit(&job).await }));

    match tokio::time::timeout(per_test, &mut handle.0).await {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => TestResult::failed(&case, format!("Executor failed: {e}")),
        Ok(Err(join_err)) => TestResult::failed(&case, format!("Executor failed: {join_err}")),
        Err(_) => TestResult::failed(&case, EXECUTION_TIMEOUT),
    }
}
