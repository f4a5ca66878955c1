//! In-memory repository (testing and single-process use)
//!
//! `MemoryDisruptionRepository` satisfies the `DisruptionRepository`
//! contract without external dependencies. Each record lives in its own
//! mutex-guarded slot; the outer map lock is held only long enough to find
//! or insert a slot, so writers on different ids never queue behind each
//! other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{DisruptionId, DisruptionRecord, DisruptionStatus, Severity};
use crate::storage_traits::*;

type Slot = Arc<Mutex<DisruptionRecord>>;

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("repository lock poisoned".to_string())
}

/// In-memory disruption repository backed by `HashMap<id, slot>`.
#[derive(Debug, Default)]
pub struct MemoryDisruptionRepository {
    slots: RwLock<HashMap<String, Slot>>,
}

impl MemoryDisruptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &DisruptionId) -> StorageResult<Option<Slot>> {
        let slots = self.slots.read().map_err(poisoned)?;
        Ok(slots.get(id.as_str()).cloned())
    }

    fn snapshot(&self) -> StorageResult<Vec<DisruptionRecord>> {
        let slots: Vec<Slot> = {
            let map = self.slots.read().map_err(poisoned)?;
            map.values().cloned().collect()
        };
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().map_err(poisoned)?.clone());
        }
        sort_records(&mut records);
        Ok(records)
    }

    fn filtered<F>(&self, keep: F) -> StorageResult<Vec<DisruptionRecord>>
    where
        F: Fn(&DisruptionRecord) -> bool,
    {
        Ok(self.snapshot()?.into_iter().filter(|r| keep(r)).collect())
    }
}

#[async_trait]
impl DisruptionRepository for MemoryDisruptionRepository {
    async fn create(&self, record: DisruptionRecord) -> StorageResult<DisruptionRecord> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        if slots.contains_key(record.id.as_str()) {
            return Err(StorageError::Duplicate {
                id: record.id.0.clone(),
            });
        }
        slots.insert(record.id.0.clone(), Arc::new(Mutex::new(record.clone())));
        Ok(record)
    }

    async fn find_by_id(&self, id: &DisruptionId) -> StorageResult<Option<DisruptionRecord>> {
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };
        let record = slot.lock().map_err(poisoned)?.clone();
        Ok(Some(record))
    }

    async fn find_by_status(
        &self,
        status: DisruptionStatus,
    ) -> StorageResult<Vec<DisruptionRecord>> {
        self.filtered(|r| r.status == status)
    }

    async fn find_by_severity(&self, severity: Severity) -> StorageResult<Vec<DisruptionRecord>> {
        self.filtered(|r| r.severity == severity)
    }

    async fn find_by_area(&self, area: &str) -> StorageResult<Vec<DisruptionRecord>> {
        self.filtered(|r| area_matches(r, area))
    }

    async fn find_by_source_reference(
        &self,
        reference: &str,
    ) -> StorageResult<Vec<DisruptionRecord>> {
        self.filtered(|r| r.source_reference_id.as_deref() == Some(reference))
    }

    async fn list(&self) -> StorageResult<Vec<DisruptionRecord>> {
        self.snapshot()
    }

    async fn update(&self, record: &DisruptionRecord) -> StorageResult<()> {
        let slot = self.slot(&record.id)?.ok_or_else(|| StorageError::NotFound {
            id: record.id.0.clone(),
        })?;
        let mut stored = slot.lock().map_err(poisoned)?;
        *stored = record.clone();
        Ok(())
    }

    async fn exists(&self, id: &DisruptionId) -> StorageResult<bool> {
        Ok(self.slot(id)?.is_some())
    }

    async fn delete(&self, id: &DisruptionId) -> StorageResult<bool> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        Ok(slots.remove(id.as_str()).is_some())
    }
}
