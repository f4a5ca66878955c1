//! Storage trait definitions for Detour
//!
//! `DisruptionRepository` is the single persistence boundary of the core.
//! It is async and backend-agnostic; the in-memory fake in `fakes` and the
//! SurrealDB backend in `surreal_repository` both satisfy the same contract.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{DisruptionId, DisruptionRecord, DisruptionStatus, Severity};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Repository over [`DisruptionRecord`]s.
///
/// Guarantees:
/// - `create` fails with `StorageError::Duplicate` if the id is taken.
/// - `update` replaces the stored record wholesale and fails with
///   `StorageError::NotFound` if the id is unknown.
/// - Operations on the same id are applied in call order; operations on
///   different ids do not wait on each other beyond map bookkeeping.
/// - List-style queries return records ordered by `detected_at`, then id.
#[async_trait]
pub trait DisruptionRepository: Send + Sync {
    /// Persist a new record, returning the stored copy.
    async fn create(&self, record: DisruptionRecord) -> StorageResult<DisruptionRecord>;

    /// Look up a record by id.
    async fn find_by_id(&self, id: &DisruptionId) -> StorageResult<Option<DisruptionRecord>>;

    /// All records currently in `status`.
    async fn find_by_status(&self, status: DisruptionStatus)
        -> StorageResult<Vec<DisruptionRecord>>;

    /// All records with computed severity `severity`.
    async fn find_by_severity(&self, severity: Severity) -> StorageResult<Vec<DisruptionRecord>>;

    /// Records whose area contains `area` (case-insensitive).
    async fn find_by_area(&self, area: &str) -> StorageResult<Vec<DisruptionRecord>>;

    /// Records carrying the given upstream reference id.
    async fn find_by_source_reference(
        &self,
        reference: &str,
    ) -> StorageResult<Vec<DisruptionRecord>>;

    /// Every stored record.
    async fn list(&self) -> StorageResult<Vec<DisruptionRecord>>;

    /// Replace an existing record.
    async fn update(&self, record: &DisruptionRecord) -> StorageResult<()>;

    /// Whether a record exists.
    async fn exists(&self, id: &DisruptionId) -> StorageResult<bool>;

    /// Delete a record. Returns whether anything was removed.
    async fn delete(&self, id: &DisruptionId) -> StorageResult<bool>;
}

/// Sort helper shared by backends.
pub(crate) fn sort_records(records: &mut [DisruptionRecord]) {
    records.sort_by(|a, b| {
        a.detected_at
            .cmp(&b.detected_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Case-insensitive area match shared by backends.
pub(crate) fn area_matches(record: &DisruptionRecord, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    record
        .location
        .area
        .as_deref()
        .map(|area| area.to_lowercase().contains(&needle))
        .unwrap_or(false)
}
