//! Structured observability hooks for the disruption lifecycle.
//!
//! Every event carries an `event = "..."` field so log pipelines can filter
//! on it. Filtering is controlled through `DETOUR_LOG` (see
//! [`crate::telemetry`]).

use tracing::{info, warn};

use crate::domain::{DisruptionId, DisruptionStatus};
use crate::journal::Stage;

/// Span tagged with a disruption id.
///
/// The orchestrator attaches it to pipeline futures with
/// `tracing::Instrument`, so it stays valid across await points.
pub fn disruption_span(id: &DisruptionId) -> tracing::Span {
    tracing::info_span!("detour.disruption", disruption_id = %id)
}

/// RAII guard entering [`disruption_span`] for synchronous sections.
///
/// ```ignore
/// let _span = DisruptionSpan::enter(&id);
/// ```
pub struct DisruptionSpan {
    _span: tracing::span::EnteredSpan,
}

impl DisruptionSpan {
    pub fn enter(id: &DisruptionId) -> Self {
        Self {
            _span: disruption_span(id).entered(),
        }
    }
}

pub fn emit_detection_received(disruption_type: &str, source: Option<&str>) {
    info!(
        event = "detection.received",
        disruption_type = %disruption_type,
        source = source.unwrap_or("unknown"),
    );
}

/// Emit event: detection failed admission and was dropped.
pub fn emit_detection_dropped(disruption_type: &str, source_reference: Option<&str>) {
    info!(
        event = "detection.dropped",
        disruption_type = %disruption_type,
        source_reference = source_reference.unwrap_or(""),
    );
}

pub fn emit_transition(id: &DisruptionId, from: DisruptionStatus, to: DisruptionStatus) {
    info!(
        event = "disruption.transition",
        disruption_id = %id,
        from = %from,
        to = %to,
    );
}

pub fn emit_stage_completed(id: &DisruptionId, stage: Stage, elapsed_ms: u64) {
    info!(
        event = "pipeline.stage_completed",
        disruption_id = %id,
        stage = %stage,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: notification handoff failed (warning level). The pipeline
/// continues.
pub fn emit_notification_failed(id: &DisruptionId, error: &dyn std::fmt::Display) {
    warn!(event = "notification.failed", disruption_id = %id, error = %error);
}

/// Emit event: pipeline aborted at `stage` (warning level).
pub fn emit_pipeline_failed(
    id: &DisruptionId,
    stage: Stage,
    elapsed_ms: u64,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "pipeline.failed",
        disruption_id = %id,
        stage = %stage,
        elapsed_ms = elapsed_ms,
        error = %error,
    );
}

pub fn emit_resolved(id: &DisruptionId, active_for_ms: i64) {
    info!(
        event = "disruption.resolved",
        disruption_id = %id,
        active_for_ms = active_for_ms,
    );
}
