//! SurrealDB schema initialization
//!
//! Defines the `disruptions` table and its lookup indexes.
//! Safe to run on every connection (DEFINE statements are idempotent).

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Detour tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Detour SurrealDB schema");
    init_disruptions_table(db).await?;
    info!("Detour schema initialization complete");
    Ok(())
}

/// Initialize `disruptions` table
///
/// Schema:
/// ```text
/// TABLE disruptions {
///   disruption_id:        STRING (unique)
///   status:               STRING (indexed)
///   severity:             STRING (indexed)
///   area:                 STRING? (lower-cased for matching)
///   source_reference_id:  STRING? (indexed)
///   detected_at:          DATETIME
///   body:                 OBJECT (full record, JSON)
/// }
/// ```
///
/// Deletes are permitted at the table level; the orchestrator never issues them.
async fn init_disruptions_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing disruptions table");

    let sql = r#"
        DEFINE TABLE disruptions SCHEMALESS;

        DEFINE INDEX idx_disruption_id ON TABLE disruptions COLUMNS disruption_id UNIQUE;
        DEFINE INDEX idx_disruption_status ON TABLE disruptions COLUMNS status;
        DEFINE INDEX idx_disruption_severity ON TABLE disruptions COLUMNS severity;
        DEFINE INDEX idx_disruption_source_ref ON TABLE disruptions COLUMNS source_reference_id;
    "#;

    db.query(sql)
        .await
        .and_then(|response| response.check())
        .map_err(|e| crate::StateError::SchemaSetup(e.to_string()))?;

    Ok(())
}
