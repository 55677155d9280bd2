//! SurrealDB schema migrations and initialization

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all fixloop tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing fixloop SurrealDB schema");
    init_results_table(db).await?;
    init_times_table(db).await?;
    info!("fixloop schema initialization complete");
    Ok(())
}

/// Initialize `results` table
///
/// Schema:
/// ```text
/// TABLE results {
///   model_name:  STRING (indexed)
///   run_name:    STRING
///   problem_id:  STRING (indexed)
///   attempt_tag: STRING
///   test_type:   STRING (enum: official | generated)
///   position:    INT
///   input:       STRING
///   expected:    STRING (JSON text)
///   actual:      STRING? (JSON text)
///   passed:      BOOL
///   error:       STRING?
///   created_at:  DATETIME
/// }
/// ```
///
/// Rows are append-only: update and delete are denied.
async fn init_results_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing results table");

    let sql = r#"
        DEFINE TABLE results AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX idx_problem_id ON TABLE results COLUMNS problem_id;
        DEFINE INDEX idx_model_run ON TABLE results COLUMNS model_name, run_name;
        DEFINE INDEX idx_problem_attempt ON TABLE results COLUMNS problem_id, attempt_tag, test_type;
    "#;

    db.query(sql).await?;
    info!("✓ results table initialized");
    Ok(())
}

/// Initialize `times` table
///
/// Schema:
/// ```text
/// TABLE times {
///   model_name:       STRING (indexed)
///   run_name:         STRING
///   problem_id:       STRING
///   response_time_ms: INT
///   created_at:       DATETIME
/// }
/// ```
async fn init_times_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing times table");

    let sql = r#"
        DEFINE TABLE times AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX idx_times_model_run ON TABLE times COLUMNS model_name, run_name;
    "#;

    db.query(sql).await?;
    info!("✓ times table initialized");
    Ok(())
}
