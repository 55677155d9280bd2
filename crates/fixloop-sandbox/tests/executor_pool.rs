//! Executor behavior with scripted unit runners: ordering, timeouts,
//! failures and panics, independent of any interpreter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fixloop_sandbox::{
    SandboxConfig, SandboxError, SandboxExecutor, SandboxResult, UnitJob, UnitRunner,
    EXECUTION_TIMEOUT,
};
use fixloop_state::{TestCase, TestInput, TestResult};
use serde_json::json;

/// Echoes the input after sleeping `delay_ms(input)`.
struct ScriptedRunner {
    delay_ms: fn(i64) -> Option<u64>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    fn new(delay_ms: fn(i64) -> Option<u64>) -> Self {
        Self {
            delay_ms,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn input_of(job: &UnitJob) -> i64 {
    match &job.case.input {
        TestInput::Single(v) => v.as_i64().unwrap_or_default(),
        TestInput::Args(args) => args.first().and_then(|v| v.as_i64()).unwrap_or_default(),
    }
}

#[async_trait]
impl UnitRunner for ScriptedRunner {
    async fn run_unit(&self, job: &UnitJob) -> SandboxResult<TestResult> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let x = input_of(job);
        match (self.delay_ms)(x) {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let actual = json!(x);
        Ok(TestResult {
            input: job.case.input.clone(),
            expected: job.case.expected.clone(),
            passed: actual == job.case.expected,
            actual: Some(actual),
            error: None,
        })
    }
}

struct FailingRunner;

#[async_trait]
impl UnitRunner for FailingRunner {
    async fn run_unit(&self, job: &UnitJob) -> SandboxResult<TestResult> {
        match input_of(job) {
            2 => Err(SandboxError::Task("boom".to_string())),
            3 => panic!("runner exploded"),
            x => Ok(TestResult {
                input: job.case.input.clone(),
                expected: job.case.expected.clone(),
                actual: Some(json!(x)),
                passed: true,
                error: None,
            }),
        }
    }
}

fn echo_cases(n: i64) -> Vec<TestCase> {
    (0..n).map(|i| TestCase::single(json!(i), json!(i))).collect()
}

fn config(max_workers: usize) -> SandboxConfig {
    SandboxConfig {
        per_test_timeout_ms: 400,
        max_workers,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn results_keep_submission_order() {
    // Later inputs finish first.
    let runner = ScriptedRunner::new(|x| Some(((10 - x) * 20) as u64));
    let executor = SandboxExecutor::new(runner, config(16));
    let cases = echo_cases(10);

    let report = executor.run("src", "f", &cases).await;

    assert_eq!(report.results.len(), 10);
    for (i, r) in report.results.iter().enumerate() {
        assert_eq!(r.input, TestInput::Single(json!(i)));
        assert!(r.passed);
    }
    assert!(report.error_classes.is_empty());
    assert!(report.all_passed());
}

#[tokio::test(start_paused = true)]
async fn hanging_unit_times_out_alone() {
    let runner = ScriptedRunner::new(|x| if x == 1 { None } else { Some(5) });
    let executor = SandboxExecutor::new(runner, config(4));

    let report = executor.run("src", "f", &echo_cases(3)).await;

    assert!(report.results[0].passed);
    assert!(!report.results[1].passed);
    assert_eq!(report.results[1].actual, None);
    assert_eq!(report.results[1].error.as_deref(), Some(EXECUTION_TIMEOUT));
    assert!(report.results[2].passed);
    assert_eq!(report.passed_count(), 2);
    assert_eq!(
        report.error_classes.iter().collect::<Vec<_>>(),
        vec![EXECUTION_TIMEOUT]
    );
}

#[tokio::test(start_paused = true)]
async fn all_units_hanging_are_all_timed_out() {
    let runner = ScriptedRunner::new(|_| None);
    let cfg = SandboxConfig {
        max_workers: 1,
        overhead_ms: 0,
        grace_ms: 0,
        ..config(1)
    };
    let executor = SandboxExecutor::new(runner, cfg);

    let report = executor
        .run_with_timeout("src", "f", &echo_cases(3), Duration::from_millis(1_000))
        .await;

    assert_eq!(report.results.len(), 3);
    assert!(report
        .results
        .iter()
        .all(|r| !r.passed && r.error.as_deref() == Some(EXECUTION_TIMEOUT)));
}

#[tokio::test(start_paused = true)]
async fn pool_never_exceeds_worker_cap() {
    let runner = ScriptedRunner::new(|_| Some(50));
    let peak = Arc::clone(&runner.peak);
    let executor = SandboxExecutor::new(runner, config(2));

    let report = executor.run("src", "f", &echo_cases(8)).await;

    assert_eq!(report.passed_count(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn runner_errors_and_panics_become_executor_failures() {
    let executor = SandboxExecutor::new(FailingRunner, config(4));

    let report = executor.run("src", "f", &echo_cases(5)).await;

    assert_eq!(report.results.len(), 5);
    assert!(report.results[0].passed);
    assert!(report.results[1].passed);
    let err2 = report.results[2].error.as_deref().unwrap();
    assert!(err2.starts_with("Executor failed:"), "{err2}");
    assert!(err2.contains("boom"));
    let err3 = report.results[3].error.as_deref().unwrap();
    assert!(err3.starts_with("Executor failed:"), "{err3}");
    assert!(report.results[4].passed);
}

#[tokio::test]
async fn empty_fixture_list_yields_empty_report() {
    let executor = SandboxExecutor::new(FailingRunner, config(4));
    let report = executor.run("src", "f", &[]).await;
    assert!(report.results.is_empty());
    assert!(report.error_classes.is_empty());
}
