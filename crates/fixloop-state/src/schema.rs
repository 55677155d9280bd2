//! Schema definitions for fixloop SurrealDB tables
//!
//! Tables:
//! - results: one row per executed fixture, tagged with attempt and fixture set
//! - times: first-generation latency per problem
//!
//! Expected and actual values are stored as JSON text so integers wider
//! than 64 bits keep every digit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{AttemptRecord, GenerationMetric, TestResult};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Result row - one executed fixture within an attempt snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub model_name: String,
    pub run_name: String,
    pub problem_id: String,
    /// `reprompt_<n>`
    pub attempt_tag: String,
    /// "official" | "generated"
    pub test_type: String,
    /// Position of the fixture within its set
    pub position: u64,
    /// Fixture input rendered for humans, e.g. `(1, "a")`
    pub input: String,
    /// Expected output as JSON text
    pub expected: String,
    /// Actual output as JSON text, absent on error or timeout
    pub actual: Option<String>,
    pub passed: bool,
    pub error: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ResultRow {
    /// Flatten one result of an attempt snapshot into a row.
    pub fn from_result(record: &AttemptRecord, position: usize, result: &TestResult) -> Self {
        ResultRow {
            id: None,
            model_name: record.model_name.clone(),
            run_name: record.run_name.clone(),
            problem_id: record.problem_id.clone(),
            attempt_tag: record.attempt_tag.clone(),
            test_type: record.fixture_set.as_str().to_string(),
            position: position as u64,
            input: result.input.to_string(),
            expected: result.expected.to_string(),
            actual: result.actual.as_ref().map(|v| v.to_string()),
            passed: result.passed,
            error: result.error.clone(),
            created_at: record.recorded_at,
        }
    }
}

/// Times row - latency of the first generation for one problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub model_name: String,
    pub run_name: String,
    pub problem_id: String,
    pub response_time_ms: u64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&GenerationMetric> for TimeRow {
    fn from(metric: &GenerationMetric) -> Self {
        TimeRow {
            id: None,
            model_name: metric.model_name.clone(),
            run_name: metric.run_name.clone(),
            problem_id: metric.problem_id.clone(),
            response_time_ms: metric.response_time_ms,
            created_at: metric.recorded_at,
        }
    }
}
