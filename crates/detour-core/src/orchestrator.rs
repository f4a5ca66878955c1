//! Disruption pipeline orchestration.
//!
//! One call to [`Orchestrator::handle_detection`] runs a detection end to end:
//!
//! ```text
//! validate → admit → DETECTED → ANALYZING → (generate, score, compile)
//!          → NOTIFYING → notify → ACTIVE
//! ```
//!
//! Every transition is persisted and journaled before the next step starts.
//! Work on a single disruption id is serialized through a per-id async lock;
//! unrelated ids run in parallel. Notification failures are absorbed, while
//! any other failure aborts the run and leaves the record in the last state
//! it reached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::Instrument;

use detour_state::DisruptionRepository;

use crate::compiler::SolutionCompiler;
use crate::config::{DetourConfig, PipelineConfig};
use crate::directory::{NoDirectory, StopDirectory};
use crate::domain::{
    CompiledSolution, DetectionEvent, DetourError, DisruptionId, DisruptionRecord,
    DisruptionStatus, NotificationPriority, Result,
};
use crate::gate::{AdmissionVerdict, ThresholdGate};
use crate::generator::{CandidateSource, RouteCandidateGenerator};
use crate::journal::{IncidentJournal, IncidentLogEntry, Stage};
use crate::metrics::METRICS;
use crate::notify::{LogNotifier, Notifier};
use crate::obs;
use crate::scorer::RouteScorer;

/// What happened to one detection event.
#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    /// No admission trigger fired; nothing was stored.
    Dropped,
    /// An open record already tracks the same source reference.
    Duplicate { existing: DisruptionId },
    /// The pipeline reached ACTIVE.
    Processed(Box<PipelineReport>),
}

impl DetectionOutcome {
    pub fn report(&self) -> Option<&PipelineReport> {
        match self {
            DetectionOutcome::Processed(report) => Some(report),
            _ => None,
        }
    }
}

/// Final state of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub record: DisruptionRecord,
    pub solution: CompiledSolution,
    pub verdict: AdmissionVerdict,
    pub priority: NotificationPriority,
    pub elapsed_ms: u64,
}

/// Per-key async locks. A key's slot is evicted once its last holder or
/// waiter lets go, so the map only tracks keys in use.
#[derive(Default)]
struct DisruptionLocks {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DisruptionLocks {
    async fn acquire(&self, key: &str) -> SlotGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        // Built before waiting so a cancelled wait still evicts the slot.
        let mut held = SlotGuard {
            locks: self,
            key: key.to_string(),
            guard: None,
        };
        held.guard = Some(slot.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held lock on one key. Dropping it releases the lock and evicts the slot
/// when nobody else references it.
struct SlotGuard<'a> {
    locks: &'a DisruptionLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: no holder, no waiter.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

/// Builder for [`Orchestrator`]. Only the repository is required.
pub struct OrchestratorBuilder {
    repository: Arc<dyn DisruptionRepository>,
    config: DetourConfig,
    journal: Option<Arc<IncidentJournal>>,
    notifier: Option<Arc<dyn Notifier>>,
    directory: Option<Arc<dyn StopDirectory>>,
    source: Option<Arc<dyn CandidateSource>>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: DetourConfig) -> Self {
        self.config = config;
        self
    }

    pub fn journal(mut self, journal: Arc<IncidentJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn StopDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn candidate_source(mut self, source: Arc<dyn CandidateSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            repository: self.repository,
            journal: self.journal.unwrap_or_default(),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            directory: self.directory.unwrap_or_else(|| Arc::new(NoDirectory)),
            source: self
                .source
                .unwrap_or_else(|| Arc::new(RouteCandidateGenerator)),
            gate: ThresholdGate::new(self.config.gate),
            scorer: RouteScorer,
            compiler: SolutionCompiler::new(self.config.compiler),
            pipeline: self.config.pipeline,
            locks: DisruptionLocks::default(),
        }
    }
}

pub struct Orchestrator {
    repository: Arc<dyn DisruptionRepository>,
    journal: Arc<IncidentJournal>,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn StopDirectory>,
    source: Arc<dyn CandidateSource>,
    gate: ThresholdGate,
    scorer: RouteScorer,
    compiler: SolutionCompiler,
    pipeline: PipelineConfig,
    locks: DisruptionLocks,
}

impl Orchestrator {
    pub fn builder(repository: Arc<dyn DisruptionRepository>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            repository,
            config: DetourConfig::default(),
            journal: None,
            notifier: None,
            directory: None,
            source: None,
        }
    }

    pub fn gate(&self) -> &ThresholdGate {
        &self.gate
    }

    pub fn journal(&self) -> &Arc<IncidentJournal> {
        &self.journal
    }

    pub fn repository(&self) -> &Arc<dyn DisruptionRepository> {
        &self.repository
    }

    /// Current stored state of a disruption.
    pub async fn record(&self, id: &DisruptionId) -> Result<Option<DisruptionRecord>> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Journal entries for a disruption, oldest first.
    pub fn history(&self, id: &DisruptionId) -> Vec<IncidentLogEntry> {
        self.journal.read_all(id)
    }

    /// Run one detection through the pipeline.
    ///
    /// Validation failures and storage failures are returned as errors.
    /// Events that fail admission come back as [`DetectionOutcome::Dropped`]
    /// with no side effects beyond logging.
    pub async fn handle_detection(&self, event: DetectionEvent) -> Result<DetectionOutcome> {
        METRICS.inc_received();
        obs::emit_detection_received(
            event.disruption_type.as_str(),
            event.data_source.as_deref(),
        );

        event.validate()?;

        let verdict = self.gate.admit(&event);
        if !verdict.admitted() {
            METRICS.inc_dropped();
            obs::emit_detection_dropped(
                event.disruption_type.as_str(),
                event.source_reference_id.as_deref(),
            );
            return Ok(DetectionOutcome::Dropped);
        }

        let id = DisruptionId::new();
        let span = obs::disruption_span(&id);
        self.run_admitted(id, event, verdict).instrument(span).await
    }

    async fn run_admitted(
        &self,
        id: DisruptionId,
        event: DetectionEvent,
        verdict: AdmissionVerdict,
    ) -> Result<DetectionOutcome> {
        let started = Instant::now();
        let now = Utc::now();
        let reported_at = event.detected_at;

        let mut record = event.into_record(id.clone(), now);
        record.severity = self.gate.calculate_severity(&record);

        let _guard = self.locks.acquire(id.as_str()).await;

        // Hold the source-reference lock only until the record exists, so a
        // concurrent duplicate sees it.
        {
            let _reference_guard = match record.source_reference_id.as_deref() {
                Some(reference) if self.pipeline.dedupe_by_source_reference => {
                    let guard = self.locks.acquire(&format!("source:{reference}")).await;
                    if let Some(existing) = self.open_record_for(reference).await? {
                        return Ok(DetectionOutcome::Duplicate { existing });
                    }
                    Some(guard)
                }
                _ => None,
            };
            self.repository.create(record.clone()).await?;
        }

        self.journal.append(
            &id,
            Stage::Intake,
            format!(
                "Detected '{}' ({} severity); admitted by {}",
                record.name,
                record.severity,
                verdict.describe()
            ),
        );
        obs::emit_stage_completed(&id, Stage::Intake, elapsed_ms(started));

        match self.advance(&mut record, started).await {
            Ok((solution, priority)) => {
                let elapsed = elapsed_ms(started);
                let latency = reported_at
                    .map(|at| format!("{} ms", (Utc::now() - at).num_milliseconds()))
                    .unwrap_or_else(|| "n/a".to_string());
                self.journal.append(
                    &id,
                    Stage::Activation,
                    format!("Pipeline completed in {elapsed} ms; detection latency {latency}"),
                );
                obs::emit_stage_completed(&id, Stage::Activation, elapsed);
                METRICS.inc_completed();
                Ok(DetectionOutcome::Processed(Box::new(PipelineReport {
                    record,
                    solution,
                    verdict,
                    priority,
                    elapsed_ms: elapsed,
                })))
            }
            Err((stage, err)) => {
                let elapsed = elapsed_ms(started);
                METRICS.inc_failed();
                obs::emit_pipeline_failed(&id, stage, elapsed, &err);
                self.journal.append(
                    &id,
                    Stage::Failure,
                    format!("{stage} failed after {elapsed} ms: {err}"),
                );
                Err(err)
            }
        }
    }

    /// DETECTED → ANALYZING → NOTIFYING → ACTIVE.
    async fn advance(
        &self,
        record: &mut DisruptionRecord,
        started: Instant,
    ) -> std::result::Result<(CompiledSolution, NotificationPriority), (Stage, DetourError)> {
        self.transition(
            record,
            DisruptionStatus::Analyzing,
            Stage::Analysis,
            "Generating alternative routes",
        )
        .await
        .map_err(|e| (Stage::Analysis, e))?;

        let candidates = self
            .source
            .candidates(record, self.directory.as_ref())
            .map_err(|e| (Stage::Analysis, pipeline_error(Stage::Analysis, e)))?;
        let scored = self.scorer.score_all(candidates);
        obs::emit_stage_completed(&record.id, Stage::Analysis, elapsed_ms(started));

        let solution = self.compiler.compile(record, &scored);
        self.journal.append(
            &record.id,
            Stage::Compilation,
            match &solution.primary {
                Some(primary) => format!(
                    "Evaluated {} options; recommending {} (score {})",
                    solution.options_evaluated, primary.route_name, primary.score
                ),
                None => "No alternatives available".to_string(),
            },
        );
        obs::emit_stage_completed(&record.id, Stage::Compilation, elapsed_ms(started));

        let priority = if self.gate.requires_immediate_action(record) {
            NotificationPriority::Immediate
        } else {
            NotificationPriority::Normal
        };
        self.transition(
            record,
            DisruptionStatus::Notifying,
            Stage::Notification,
            format!("Dispatching {priority} notification"),
        )
        .await
        .map_err(|e| (Stage::Notification, e))?;

        match self.notifier.notify(&solution, priority).await {
            Ok(()) => record.notification_sent = Some(true),
            Err(e) => {
                record.notification_sent = Some(false);
                METRICS.inc_notification_failed();
                obs::emit_notification_failed(&record.id, &e);
                self.journal
                    .append(&record.id, Stage::Notification, format!("Notification failed: {e}"));
            }
        }
        obs::emit_stage_completed(&record.id, Stage::Notification, elapsed_ms(started));

        self.transition(
            record,
            DisruptionStatus::Active,
            Stage::Activation,
            "Disruption active",
        )
        .await
        .map_err(|e| (Stage::Activation, e))?;

        Ok((solution, priority))
    }

    /// Validate, persist and journal a status change.
    async fn transition(
        &self,
        record: &mut DisruptionRecord,
        next: DisruptionStatus,
        stage: Stage,
        message: impl Into<String>,
    ) -> Result<()> {
        let from = record.status;
        if !from.can_transition_to(next) {
            return Err(DetourError::InvalidTransition {
                id: record.id.clone(),
                from,
                to: next,
            });
        }
        record.status = next;
        record.updated_at = Utc::now();
        self.repository.update(record).await?;
        self.journal.append(&record.id, stage, message);
        obs::emit_transition(&record.id, from, next);
        Ok(())
    }

    async fn open_record_for(&self, reference: &str) -> Result<Option<DisruptionId>> {
        Ok(self
            .repository
            .find_by_source_reference(reference)
            .await?
            .into_iter()
            .find(|r| !r.status.is_terminal())
            .map(|r| r.id))
    }

    /// Mark a disruption resolved.
    ///
    /// Returns `Ok(false)` for an unknown id. Resolving an already resolved
    /// disruption is a no-op returning `Ok(true)`; a cancelled one is an
    /// [`DetourError::InvalidTransition`].
    pub async fn resolve(&self, id: &DisruptionId) -> Result<bool> {
        let _guard = self.locks.acquire(id.as_str()).await;
        let Some(mut record) = self.repository.find_by_id(id).await? else {
            return Ok(false);
        };
        if record.status == DisruptionStatus::Resolved {
            return Ok(true);
        }

        let now = Utc::now();
        let open_for = now - record.detected_at;
        record.resolved_at = Some(now);
        self.transition(
            &mut record,
            DisruptionStatus::Resolved,
            Stage::Resolution,
            format!("Resolved after {} minutes", open_for.num_minutes()),
        )
        .instrument(obs::disruption_span(id))
        .await?;

        METRICS.inc_resolutions();
        obs::emit_resolved(id, open_for.num_milliseconds());
        Ok(true)
    }

    /// Withdraw a disruption from any non-terminal status.
    ///
    /// Returns `Ok(false)` for an unknown id.
    pub async fn cancel(&self, id: &DisruptionId, reason: &str) -> Result<bool> {
        let _guard = self.locks.acquire(id.as_str()).await;
        let Some(mut record) = self.repository.find_by_id(id).await? else {
            return Ok(false);
        };
        self.transition(
            &mut record,
            DisruptionStatus::Cancelled,
            Stage::Cancellation,
            format!("Cancelled: {reason}"),
        )
        .instrument(obs::disruption_span(id))
        .await?;
        Ok(true)
    }

    /// Record a new delay figure and recompute severity.
    ///
    /// Returns `Ok(false)` for an unknown id and
    /// [`DetourError::RecordClosed`] once the disruption is resolved or
    /// cancelled.
    pub async fn update_delay(&self, id: &DisruptionId, delay_minutes: u32) -> Result<bool> {
        let _guard = self.locks.acquire(id.as_str()).await;
        let Some(mut record) = self.repository.find_by_id(id).await? else {
            return Ok(false);
        };
        if record.status.is_terminal() {
            return Err(DetourError::RecordClosed {
                id: id.clone(),
                status: record.status,
            });
        }

        let previous = record.severity;
        record.delay_minutes = Some(delay_minutes);
        record.severity = self.gate.calculate_severity(&record);
        record.updated_at = Utc::now();
        self.repository.update(&record).await?;
        self.journal.append(
            id,
            Stage::Reassessment,
            format!(
                "Delay now {delay_minutes} minutes; severity {previous} -> {}",
                record.severity
            ),
        );
        Ok(true)
    }
}

fn pipeline_error(stage: Stage, err: DetourError) -> DetourError {
    match err {
        DetourError::Pipeline { .. } | DetourError::Storage(_) => err,
        other => DetourError::Pipeline {
            stage,
            message: other.to_string(),
        },
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisruptionType, Severity, TransportMode};
    use detour_state::fakes::MemoryDisruptionRepository;

    fn orchestrator() -> Orchestrator {
        Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new())).build()
    }

    fn delayed_bus(minutes: i64) -> DetectionEvent {
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Low);
        event.delay_minutes = Some(minutes);
        event.affected_transport_modes = vec![TransportMode::Bus];
        event
    }

    #[tokio::test]
    async fn quiet_event_is_dropped() {
        let orch = orchestrator();
        let event = DetectionEvent::new(DisruptionType::Congestion, Severity::Low);
        let outcome = orch.handle_detection(event).await.unwrap();
        assert!(matches!(outcome, DetectionOutcome::Dropped));
        assert_eq!(orch.journal().count(), 0);
        assert!(orch.repository().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_event_is_rejected_before_storage() {
        let orch = orchestrator();
        let event = delayed_bus(-5);
        let err = orch.handle_detection(event).await.unwrap_err();
        assert!(matches!(err, DetourError::Validation(_)));
        assert!(orch.repository().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admitted_event_reaches_active() {
        let orch = orchestrator();
        let outcome = orch.handle_detection(delayed_bus(25)).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.record.status, DisruptionStatus::Active);
        assert_eq!(report.record.notification_sent, Some(true));
        assert_eq!(report.record.severity, Severity::Medium);

        let stored = orch.record(&report.record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DisruptionStatus::Active);

        let stages: Vec<Stage> = orch
            .history(&report.record.id)
            .iter()
            .map(|e| e.stage)
            .collect();
        assert_eq!(
            stages,
            vec![
                Stage::Intake,
                Stage::Analysis,
                Stage::Compilation,
                Stage::Notification,
                Stage::Activation,
                Stage::Activation,
            ]
        );
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let orch = orchestrator();
        let outcome = orch.handle_detection(delayed_bus(15)).await.unwrap();
        let id = outcome.report().unwrap().record.id.clone();

        assert!(orch.resolve(&id).await.unwrap());
        assert!(orch.resolve(&id).await.unwrap());
        let stored = orch.record(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DisruptionStatus::Resolved);
        assert!(stored.resolved_at.is_some());
        let resolutions = orch
            .history(&id)
            .iter()
            .filter(|e| e.stage == Stage::Resolution)
            .count();
        assert_eq!(resolutions, 1);
    }

    #[tokio::test]
    async fn update_delay_recomputes_severity_until_closed() {
        let orch = orchestrator();
        let outcome = orch.handle_detection(delayed_bus(10)).await.unwrap();
        let id = outcome.report().unwrap().record.id.clone();

        assert!(orch.update_delay(&id, 45).await.unwrap());
        let stored = orch.record(&id).await.unwrap().unwrap();
        assert_eq!(stored.delay_minutes, Some(45));
        assert_eq!(stored.severity, Severity::Medium);

        orch.resolve(&id).await.unwrap();
        let err = orch.update_delay(&id, 5).await.unwrap_err();
        assert!(matches!(err, DetourError::RecordClosed { .. }));
        assert!(!orch
            .update_delay(&DisruptionId::from("missing"), 5)
            .await
            .unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lock_slots_are_evicted_after_use() {
        let mut config = DetourConfig::default();
        config.pipeline.dedupe_by_source_reference = true;
        let orch = Arc::new(
            Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
                .config(config)
                .build(),
        );

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let orch = Arc::clone(&orch);
                tokio::spawn(async move {
                    let mut event = delayed_bus(20);
                    event.source_reference_id = Some(format!("feed-{}", i % 10));
                    orch.handle_detection(event).await.unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            if let Some(report) = handle.await.unwrap().report() {
                ids.push(report.record.id.clone());
            }
        }
        assert_eq!(ids.len(), 10);
        for id in &ids {
            assert!(orch.resolve(id).await.unwrap());
        }
        assert_eq!(orch.locks.len(), 0);
    }

    #[tokio::test]
    async fn held_slot_survives_until_last_waiter() {
        let locks = Arc::new(DisruptionLocks::default());
        let first = locks.acquire("d-1").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _second = locks.acquire("d-1").await;
            })
        };
        tokio::task::yield_now().await;
        drop(first);
        assert!(locks.len() <= 1);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn abandoned_wait_does_not_leave_a_slot() {
        let locks = DisruptionLocks::default();
        let first = locks.acquire("d-1").await;

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            locks.acquire("d-1"),
        )
        .await;
        assert!(waited.is_err());

        drop(first);
        assert_eq!(locks.len(), 0);
    }
}
