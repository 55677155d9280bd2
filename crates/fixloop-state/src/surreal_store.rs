//! SurrealDB-backed ResultStore implementation
//!
//! Each attempt snapshot is flattened into one `results` row per fixture;
//! generation latencies go to `times`.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::{ResultRow, TimeRow};
use crate::storage_traits::{AttemptRecord, GenerationMetric, ResultStore, StorageResult};

/// SurrealDB-backed implementation of [`ResultStore`].
pub struct SurrealResultStore {
    db: Surreal<Any>,
}

impl SurrealResultStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `fixloop/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host`).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {url}: {e}")))?;

        db.use_ns("fixloop")
            .use_db("main")
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealResultStore connected ({})", url);
        Ok(Self { db })
    }

    /// Open a local persistent store under `dir`.
    pub async fn open_local(dir: &std::path::Path) -> crate::Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Self::connect(&format!("surrealkv://{}", dir.display())).await
    }

    /// All rows for a problem, ordered by attempt then fixture position.
    pub async fn results_for(&self, problem_id: &str) -> StorageResult<Vec<ResultRow>> {
        let pid = problem_id.to_string();
        let mut res = self
            .db
            .query(
                "SELECT * FROM results WHERE problem_id = $pid \
                 ORDER BY created_at ASC, test_type DESC, position ASC",
            )
            .bind(("pid", pid))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        res.take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Generation latencies for a model and run, oldest first.
    pub async fn metrics_for(&self, model_name: &str, run_name: &str) -> StorageResult<Vec<TimeRow>> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM times WHERE model_name = $model AND run_name = $run \
                 ORDER BY created_at ASC",
            )
            .bind(("model", model_name.to_string()))
            .bind(("run", run_name.to_string()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        res.take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[async_trait]
impl ResultStore for SurrealResultStore {
    async fn record(&self, record: &AttemptRecord) -> StorageResult<()> {
        debug!(
            problem_id = %record.problem_id,
            attempt = %record.attempt_tag,
            test_type = %record.fixture_set,
            rows = record.results.len(),
            "recording attempt results"
        );

        for (position, result) in record.results.iter().enumerate() {
            let row = ResultRow::from_result(record, position, result);
            let _created: Option<ResultRow> = self
                .db
                .create("results")
                .content(row)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        Ok(())
    }

    async fn record_metric(&self, metric: &GenerationMetric) -> StorageResult<()> {
        debug!(
            problem_id = %metric.problem_id,
            response_time_ms = metric.response_time_ms,
            "recording generation latency"
        );
        let _created: Option<TimeRow> = self
            .db
            .create("times")
            .content(TimeRow::from(metric))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
