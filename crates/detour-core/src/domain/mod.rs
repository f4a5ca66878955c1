//! Domain models for Detour.
//!
//! - `DetectionEvent`: inbound report from a detection source
//! - `RouteCandidate`: one proposed alternative route
//! - `CompiledSolution`: the ranked recommendation package
//!
//! The persisted `DisruptionRecord` and its enums live in `detour-state`
//! and are re-exported here.

pub mod candidate;
pub mod error;
pub mod event;
pub mod solution;

pub use candidate::{RouteCandidate, LEG_DELIMITERS};
pub use error::{DetourError, Result, ValidationError};
pub use event::DetectionEvent;
pub use solution::{CompiledSolution, NotificationPriority};

pub use detour_state::{
    DisruptionId, DisruptionRecord, DisruptionStatus, DisruptionType, Location, Severity,
    TransportMode,
};
