//! Domain-level error taxonomy for Detour.

use detour_state::{DisruptionId, DisruptionStatus, StorageError};

use crate::journal::Stage;

/// Reasons a detection event is rejected before admission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("latitude and longitude must be given together")]
    PartialCoordinates,

    #[error("delay must not be negative, got {0} minutes")]
    NegativeDelay(i64),

    #[error("estimated end time precedes start time")]
    EndBeforeStart,

    #[error("{field} contains an empty entry")]
    BlankEntry { field: &'static str },
}

/// Detour domain errors.
#[derive(Debug, thiserror::Error)]
pub enum DetourError {
    #[error("invalid detection event: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("pipeline stage {stage} failed: {message}")]
    Pipeline { stage: Stage, message: String },

    #[error("illegal transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: DisruptionId,
        from: DisruptionStatus,
        to: DisruptionStatus,
    },

    #[error("disruption {id} is closed ({status})")]
    RecordClosed {
        id: DisruptionId,
        status: DisruptionStatus,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Detour domain operations.
pub type Result<T> = std::result::Result<T, DetourError>;
