//! Detour Core Library
//!
//! Disruption response orchestration: admission gating, alternative route
//! generation and scoring, solution compilation, notification handoff and
//! an append-only incident journal.

pub mod compiler;
pub mod config;
pub mod directory;
pub mod domain;
pub mod gate;
pub mod generator;
pub mod journal;
pub mod metrics;
pub mod notify;
pub mod obs;
pub mod orchestrator;
pub mod scorer;
pub mod telemetry;

pub use domain::{
    CompiledSolution, DetectionEvent, DetourError, DisruptionId, DisruptionRecord,
    DisruptionStatus, DisruptionType, Location, NotificationPriority, Result, RouteCandidate,
    Severity, TransportMode, ValidationError,
};

pub use config::{CompilerConfig, DetourConfig, GateConfig, PipelineConfig};
pub use compiler::SolutionCompiler;
pub use directory::{DirectoryStop, NoDirectory, StaticDirectory, StopDirectory, StopRef};
pub use gate::{AdmissionTrigger, AdmissionVerdict, DisruptionSignals, ThresholdGate};
pub use generator::{CandidateSource, RouteCandidateGenerator};
pub use journal::{IncidentJournal, IncidentLogEntry, Stage};
pub use notify::{LogNotifier, Notifier, NotifyError, QueueNotifier, QueuedNotification};
pub use orchestrator::{DetectionOutcome, Orchestrator, OrchestratorBuilder, PipelineReport};
pub use scorer::RouteScorer;

pub use detour_state::{
    DisruptionRepository, StorageError, StorageResult, SurrealDisruptionRepository,
};

/// Detour version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
