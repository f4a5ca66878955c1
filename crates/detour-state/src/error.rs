//! Error types for detour-state

use thiserror::Error;

/// Errors raised while connecting to or preparing a backend
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::DisruptionRepository`] operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No record exists for the given disruption id
    #[error("disruption not found: {id}")]
    NotFound { id: String },

    /// A record with this id already exists
    #[error("disruption already exists: {id}")]
    Duplicate { id: String },

    /// Record could not be encoded or decoded
    #[error("record serialization failed: {0}")]
    Serialization(String),

    /// Backend failure (query error, poisoned lock, lost connection)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
