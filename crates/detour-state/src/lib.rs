//! Detour-State: disruption records and their persistence
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `DisruptionRecord` and its enums: the persisted shape of a disruption
//! - `DisruptionRepository`: async, backend-agnostic repository contract
//! - `MemoryDisruptionRepository`: in-process implementation (`fakes`)
//! - `SurrealDisruptionRepository`: SurrealDB implementation (mem, local, remote)

mod error;
pub mod fakes;
mod migrations;
pub mod record;
pub mod storage_traits;
pub mod surreal_repository;

pub use error::{StateError, StorageError};
pub use record::{
    DisruptionId, DisruptionRecord, DisruptionStatus, DisruptionType, Location, Severity,
    TransportMode,
};
pub use storage_traits::{DisruptionRepository, StorageResult};
pub use surreal_repository::SurrealDisruptionRepository;

/// Result type for detour-state setup operations
pub type Result<T> = std::result::Result<T, StateError>;
