//! Storage trait definitions for fixloop
//!
//! These traits define the boundaries the repair loop talks to:
//! - `FixtureRepository`: named fixture sets per problem
//! - `ResultStore`: append-only per-attempt test results and generation latency
//! - `StepLogger`: side-channel audit trail of each attempt's raw artifacts
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private so the string is always the lowercase hex
/// produced by `from_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Named fixture set attached to every problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureSet {
    /// Fixtures shipped with the problem statement.
    Official,
    /// Additional fixtures generated for wider coverage.
    Generated,
}

impl FixtureSet {
    /// Both sets, in the order the repair loop executes them.
    pub const ALL: [FixtureSet; 2] = [FixtureSet::Official, FixtureSet::Generated];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureSet::Official => "official",
            FixtureSet::Generated => "generated",
        }
    }
}

impl std::fmt::Display for FixtureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of a single fixture.
///
/// `Args` holds a tuple whose elements are passed as separate positional
/// arguments; `Single` is passed as the only argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TestInput {
    Single(Value),
    Args(Vec<Value>),
}

impl TestInput {
    /// JSON view of the input (tuples become arrays).
    pub fn to_json(&self) -> Value {
        match self {
            TestInput::Single(v) => v.clone(),
            TestInput::Args(args) => Value::Array(args.clone()),
        }
    }
}

impl std::fmt::Display for TestInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestInput::Single(v) => write!(f, "{v}"),
            TestInput::Args(args) => {
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                if args.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A fixed (input, expected output) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: TestInput,
    pub expected: Value,
}

impl TestCase {
    pub fn new(input: TestInput, expected: Value) -> Self {
        Self { input, expected }
    }

    /// Convenience constructor for a single-argument fixture.
    pub fn single(input: Value, expected: Value) -> Self {
        Self::new(TestInput::Single(input), expected)
    }

    /// Convenience constructor for a multi-argument fixture.
    pub fn args(args: Vec<Value>, expected: Value) -> Self {
        Self::new(TestInput::Args(args), expected)
    }
}

/// Outcome of running one fixture against a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub input: TestInput,
    pub expected: Value,
    /// `None` when the candidate raised, timed out, or never ran.
    pub actual: Option<Value>,
    pub passed: bool,
    /// Raw error message, if any.
    pub error: Option<String>,
}

impl TestResult {
    /// A failed result for `case` carrying `error` and no actual value.
    pub fn failed(case: &TestCase, error: impl Into<String>) -> Self {
        Self {
            input: case.input.clone(),
            expected: case.expected.clone(),
            actual: None,
            passed: false,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultStore
// ---------------------------------------------------------------------------

/// One persisted snapshot: the results of a fixture set for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub model_name: String,
    pub run_name: String,
    pub problem_id: String,
    /// `reprompt_<n>` where `n` is the attempt ordinal.
    pub attempt_tag: String,
    pub fixture_set: FixtureSet,
    pub results: Vec<TestResult>,
    pub recorded_at: DateTime<Utc>,
}

/// Wall-clock latency of the first generation for a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetric {
    pub model_name: String,
    pub run_name: String,
    pub problem_id: String,
    pub response_time_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only store for attempt snapshots and generation metrics.
///
/// Guarantees:
/// - `record` never mutates previously recorded snapshots.
/// - A successful `record` or `record_metric` is durable before it returns.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn record(&self, record: &AttemptRecord) -> StorageResult<()>;

    async fn record_metric(&self, metric: &GenerationMetric) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// FixtureRepository
// ---------------------------------------------------------------------------

/// Source of named fixture sets per problem.
#[async_trait]
pub trait FixtureRepository: Send + Sync {
    /// Load a fixture set. Unknown problems yield an empty list.
    async fn load(&self, problem_id: &str, set: FixtureSet) -> StorageResult<Vec<TestCase>>;
}

// ---------------------------------------------------------------------------
// StepLogger
// ---------------------------------------------------------------------------

/// Kind of raw artifact written to the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Response,
    Code,
    Analysis,
    Reprompt,
    RepromptRuntime,
    RepromptEntryNotFound,
    RepromptCodeNotFound,
    RepromptFinal,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Response => "response",
            StepKind::Code => "code",
            StepKind::Analysis => "analysis",
            StepKind::Reprompt => "reprompt",
            StepKind::RepromptRuntime => "reprompt_runtime",
            StepKind::RepromptEntryNotFound => "reprompt_entry_not_found",
            StepKind::RepromptCodeNotFound => "reprompt_code_not_found",
            StepKind::RepromptFinal => "reprompt_final",
        }
    }
}

/// One numbered audit artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Sequence number within the problem, threaded by the caller.
    pub seq: u32,
    pub kind: StepKind,
    /// Attempt ordinal (1-based).
    pub attempt: u32,
    pub content: String,
}

impl StepRecord {
    /// Canonical artifact name, e.g. `03_reprompt_2.txt`.
    pub fn file_name(&self) -> String {
        format!("{:02}_{}_{}.txt", self.seq, self.kind.as_str(), self.attempt)
    }
}

/// Side-channel writer for audit artifacts. Has no behavioral coupling
/// to the repair loop beyond receiving records.
#[async_trait]
pub trait StepLogger: Send + Sync {
    async fn write_step(&self, problem_id: &str, step: &StepRecord) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_is_lowercase_sha256_hex() {
        let d = ContentDigest::from_bytes(b"");
        assert_eq!(
            d.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_short_is_prefix() {
        let d = ContentDigest::from_bytes(b"def f(x):\n    return x");
        assert_eq!(d.short().len(), 12);
        assert!(d.as_str().starts_with(d.short()));
    }

    #[test]
    fn test_input_display_marks_one_tuple() {
        assert_eq!(TestInput::Args(vec![json!(1)]).to_string(), "(1,)");
        assert_eq!(
            TestInput::Args(vec![json!(1), json!("a")]).to_string(),
            "(1, \"a\")"
        );
        assert_eq!(TestInput::Single(json!([1, 2])).to_string(), "[1,2]");
    }

    #[test]
    fn failed_result_has_no_actual() {
        let case = TestCase::single(json!(3), json!(4));
        let result = TestResult::failed(&case, "boom");
        assert!(!result.passed);
        assert!(result.actual.is_none());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn step_file_name_is_zero_padded() {
        let step = StepRecord {
            seq: 3,
            kind: StepKind::RepromptRuntime,
            attempt: 2,
            content: String::new(),
        };
        assert_eq!(step.file_name(), "03_reprompt_runtime_2.txt");
    }

    #[test]
    fn fixture_set_order_is_official_first() {
        assert_eq!(FixtureSet::ALL[0], FixtureSet::Official);
        assert_eq!(FixtureSet::Generated.to_string(), "generated");
    }
}
