//! SurrealDB-backed DisruptionRepository implementation
//!
//! Rows keep a handful of indexed columns next to the full record, which is
//! stored as a JSON object in `body` and decoded at the boundary.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::record::{DisruptionId, DisruptionRecord, DisruptionStatus, Severity};
use crate::storage_traits::*;

const NAMESPACE: &str = "detour";
const DATABASE: &str = "main";

/// Serialize chrono timestamps as native SurrealDB datetimes
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(&SurrealDatetime::from(*date), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Row stored in the `disruptions` table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DisruptionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<surrealdb::sql::Thing>,
    disruption_id: String,
    status: String,
    severity: String,
    area: Option<String>,
    source_reference_id: Option<String>,
    #[serde(with = "surreal_datetime")]
    detected_at: DateTime<Utc>,
    body: serde_json::Value,
}

impl DisruptionRow {
    fn from_record(record: &DisruptionRecord) -> StorageResult<Self> {
        Ok(Self {
            id: None,
            disruption_id: record.id.0.clone(),
            status: record.status.as_str().to_string(),
            severity: record.severity.as_str().to_string(),
            area: record.location.area.as_ref().map(|a| a.to_lowercase()),
            source_reference_id: record.source_reference_id.clone(),
            detected_at: record.detected_at,
            body: serde_json::to_value(record)?,
        })
    }

    fn into_record(self) -> StorageResult<DisruptionRecord> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// SurrealDB-backed implementation of [`DisruptionRepository`].
pub struct SurrealDisruptionRepository {
    db: Surreal<Any>,
}

impl SurrealDisruptionRepository {
    /// Create an in-memory instance (`mem://`).
    pub async fn in_memory() -> crate::Result<Self> {
        let repo = Self::connect("mem://").await?;
        info!("SurrealDisruptionRepository connected (in-memory)");
        Ok(repo)
    }

    /// Open (or create) a local SurrealKV store under `path`.
    pub async fn open_local(path: &Path) -> crate::Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let url = format!("surrealkv://{}", path.display());
        let repo = Self::connect(&url).await?;
        info!(url = %url, "SurrealDisruptionRepository connected (local)");
        Ok(repo)
    }

    /// Connect to any SurrealDB endpoint URL and prepare the schema.
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_row(&self, id: &DisruptionId) -> StorageResult<Option<DisruptionRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM disruptions WHERE disruption_id = $id")
            .bind(("id", id.0.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DisruptionRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn select_where(
        &self,
        column: &'static str,
        value: String,
    ) -> StorageResult<Vec<DisruptionRecord>> {
        let sql = format!("SELECT * FROM disruptions WHERE {column} = $value");
        let mut res = self
            .db
            .query(sql)
            .bind(("value", value))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DisruptionRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Self::decode_sorted(rows)
    }

    fn decode_sorted(rows: Vec<DisruptionRow>) -> StorageResult<Vec<DisruptionRecord>> {
        let mut records = rows
            .into_iter()
            .map(DisruptionRow::into_record)
            .collect::<StorageResult<Vec<_>>>()?;
        sort_records(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl DisruptionRepository for SurrealDisruptionRepository {
    async fn create(&self, record: DisruptionRecord) -> StorageResult<DisruptionRecord> {
        if self.fetch_row(&record.id).await?.is_some() {
            return Err(StorageError::Duplicate {
                id: record.id.0.clone(),
            });
        }

        debug!(disruption_id = %record.id, "creating disruption");
        let row = DisruptionRow::from_record(&record)?;
        let _created: Option<DisruptionRow> = self
            .db
            .create("disruptions")
            .content(row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(record)
    }

    async fn find_by_id(&self, id: &DisruptionId) -> StorageResult<Option<DisruptionRecord>> {
        self.fetch_row(id)
            .await?
            .map(DisruptionRow::into_record)
            .transpose()
    }

    async fn find_by_status(
        &self,
        status: DisruptionStatus,
    ) -> StorageResult<Vec<DisruptionRecord>> {
        self.select_where("status", status.as_str().to_string())
            .await
    }

    async fn find_by_severity(&self, severity: Severity) -> StorageResult<Vec<DisruptionRecord>> {
        self.select_where("severity", severity.as_str().to_string())
            .await
    }

    async fn find_by_area(&self, area: &str) -> StorageResult<Vec<DisruptionRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| area_matches(r, area))
            .collect())
    }

    async fn find_by_source_reference(
        &self,
        reference: &str,
    ) -> StorageResult<Vec<DisruptionRecord>> {
        self.select_where("source_reference_id", reference.to_string())
            .await
    }

    async fn list(&self) -> StorageResult<Vec<DisruptionRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM disruptions")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DisruptionRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Self::decode_sorted(rows)
    }

    async fn update(&self, record: &DisruptionRecord) -> StorageResult<()> {
        if self.fetch_row(&record.id).await?.is_none() {
            return Err(StorageError::NotFound {
                id: record.id.0.clone(),
            });
        }

        let row = DisruptionRow::from_record(record)?;
        self.db
            .query("UPDATE disruptions CONTENT $row WHERE disruption_id = $id")
            .bind(("row", row))
            .bind(("id", record.id.0.clone()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn exists(&self, id: &DisruptionId) -> StorageResult<bool> {
        Ok(self.fetch_row(id).await?.is_some())
    }

    async fn delete(&self, id: &DisruptionId) -> StorageResult<bool> {
        if self.fetch_row(id).await?.is_none() {
            return Ok(false);
        }

        self.db
            .query("DELETE disruptions WHERE disruption_id = $id")
            .bind(("id", id.0.clone()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DisruptionType, Location};

    fn record(id: &str) -> DisruptionRecord {
        let now = Utc::now();
        DisruptionRecord {
            id: DisruptionId::from(id),
            name: format!("Disruption {id}"),
            description: String::new(),
            status: DisruptionStatus::Active,
            disruption_type: DisruptionType::Delay,
            severity: Severity::Medium,
            reported_severity: Severity::Medium,
            location: Location::default(),
            affected_transport_modes: Vec::new(),
            affected_routes: Vec::new(),
            affected_stops: Vec::new(),
            detected_at: now,
            start_time: None,
            estimated_end_time: None,
            resolved_at: None,
            delay_minutes: Some(20),
            data_source: None,
            source_reference_id: None,
            notification_sent: Some(true),
            event_name: None,
            construction_project: None,
            traffic_congestion_level: None,
            additional_notes: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn rejected_update_is_reported() {
        let repo = SurrealDisruptionRepository::in_memory().await.unwrap();
        let mut stored = repo.create(record("d-1")).await.unwrap();

        repo.db
            .query("DEFINE FIELD severity ON TABLE disruptions ASSERT $value != 'CRITICAL'")
            .await
            .unwrap()
            .check()
            .unwrap();

        stored.severity = Severity::Critical;
        let err = repo.update(&stored).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let current = repo.find_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(current.severity, Severity::Medium);
    }
}
