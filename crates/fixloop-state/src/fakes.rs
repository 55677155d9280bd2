//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryResultStore`, `MemoryFixtureRepository`, and
//! `MemoryStepLogger` that satisfy the trait contracts without any
//! external dependencies.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

fn lock<T>(m: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|e| StorageError::Backend(format!("lock poisoned: {e}")))
}

// ---------------------------------------------------------------------------
// MemoryResultStore
// ---------------------------------------------------------------------------

/// In-memory result store that keeps every snapshot in arrival order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<Vec<AttemptRecord>>,
    metrics: Mutex<Vec<GenerationMetric>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Records for one problem, in arrival order.
    pub fn records_for(&self, problem_id: &str) -> Vec<AttemptRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.problem_id == problem_id)
            .collect()
    }

    /// Every generation metric written so far.
    pub fn metrics(&self) -> Vec<GenerationMetric> {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn record(&self, record: &AttemptRecord) -> StorageResult<()> {
        lock(&self.records)?.push(record.clone());
        Ok(())
    }

    async fn record_metric(&self, metric: &GenerationMetric) -> StorageResult<()> {
        lock(&self.metrics)?.push(metric.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryFixtureRepository
// ---------------------------------------------------------------------------

/// In-memory fixture repository keyed by `(problem_id, set)`.
#[derive(Debug, Default)]
pub struct MemoryFixtureRepository {
    fixtures: Mutex<HashMap<(String, FixtureSet), Vec<TestCase>>>,
}

impl MemoryFixtureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a fixture set for a problem.
    pub fn insert(&self, problem_id: &str, set: FixtureSet, cases: Vec<TestCase>) {
        if let Ok(mut fixtures) = self.fixtures.lock() {
            fixtures.insert((problem_id.to_string(), set), cases);
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(self, problem_id: &str, set: FixtureSet, cases: Vec<TestCase>) -> Self {
        self.insert(problem_id, set, cases);
        self
    }
}

#[async_trait]
impl FixtureRepository for MemoryFixtureRepository {
    async fn load(&self, problem_id: &str, set: FixtureSet) -> StorageResult<Vec<TestCase>> {
        let fixtures = lock(&self.fixtures)?;
        Ok(fixtures
            .get(&(problem_id.to_string(), set))
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryStepLogger
// ---------------------------------------------------------------------------

/// In-memory step logger backed by `HashMap<problem_id, Vec<StepRecord>>`.
#[derive(Debug, Default)]
pub struct MemoryStepLogger {
    steps: Mutex<HashMap<String, Vec<StepRecord>>>,
}

impl MemoryStepLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps written for one problem, in write order.
    pub fn steps(&self, problem_id: &str) -> Vec<StepRecord> {
        self.steps
            .lock()
            .ok()
            .and_then(|s| s.get(problem_id).cloned())
            .unwrap_or_default()
    }

    /// Artifact names for one problem, in write order.
    pub fn file_names(&self, problem_id: &str) -> Vec<String> {
        self.steps(problem_id)
            .iter()
            .map(StepRecord::file_name)
            .collect()
    }
}

#[async_trait]
impl StepLogger for MemoryStepLogger {
    async fn write_step(&self, problem_id: &str, step: &StepRecord) -> StorageResult<()> {
        lock(&self.steps)?
            .entry(problem_id.to_string())
            .or_default()
            .push(step.clone());
        Ok(())
    }
}
