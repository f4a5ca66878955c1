//! Append-only incident journal.
//!
//! Each disruption id owns its own bucket behind its own mutex, so appends
//! to one id are applied in call order while appends to different ids never
//! contend beyond the brief map lookup. The journal is an owned component:
//! the orchestrator holds one and callers inject a shared instance when they
//! need to read it back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DisruptionId;

/// Pipeline stage an entry was written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Intake,
    Analysis,
    Compilation,
    Notification,
    Activation,
    Resolution,
    Cancellation,
    Reassessment,
    Failure,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Intake => "INTAKE",
            Stage::Analysis => "ANALYSIS",
            Stage::Compilation => "COMPILATION",
            Stage::Notification => "NOTIFICATION",
            Stage::Activation => "ACTIVATION",
            Stage::Resolution => "RESOLUTION",
            Stage::Cancellation => "CANCELLATION",
            Stage::Reassessment => "REASSESSMENT",
            Stage::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLogEntry {
    pub disruption_id: DisruptionId,
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub message: String,
}

type Bucket = Arc<Mutex<Vec<IncidentLogEntry>>>;

#[derive(Debug, Default)]
pub struct IncidentJournal {
    buckets: RwLock<HashMap<DisruptionId, Bucket>>,
    total: AtomicUsize,
}

impl IncidentJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time.
    pub fn append(&self, id: &DisruptionId, stage: Stage, message: impl Into<String>) {
        let entry = IncidentLogEntry {
            disruption_id: id.clone(),
            timestamp: Utc::now(),
            stage,
            message: message.into(),
        };
        let bucket = self.bucket(id);
        bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries for `id` in insertion order; empty when none were written.
    pub fn read_all(&self, id: &DisruptionId) -> Vec<IncidentLogEntry> {
        let bucket = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        match bucket {
            Some(bucket) => bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            None => Vec::new(),
        }
    }

    /// Total entries across all ids.
    pub fn count(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.total.store(0, Ordering::Relaxed);
    }

    fn bucket(&self, id: &DisruptionId) -> Bucket {
        if let Some(bucket) = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Arc::clone(bucket);
        }
        let mut buckets = self
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(buckets.entry(id.clone()).or_default())
    }
}
