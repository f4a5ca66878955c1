//! End-to-end pipeline tests against in-memory and SurrealDB repositories.

use std::sync::Arc;

use async_trait::async_trait;
use detour_core::directory::StopDirectory;
use detour_core::{
    CandidateSource, CompiledSolution, DetectionEvent, DetectionOutcome, DetourConfig,
    DetourError, DisruptionId, DisruptionRecord, DisruptionRepository, DisruptionStatus,
    DisruptionType, IncidentJournal, NotificationPriority, Notifier, NotifyError, Orchestrator,
    QueueNotifier, RouteCandidate, Severity, Stage, SurrealDisruptionRepository, TransportMode,
};
use detour_state::fakes::MemoryDisruptionRepository;

fn memory_orchestrator() -> Orchestrator {
    Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new())).build()
}

fn city_centre_cancellation() -> DetectionEvent {
    let mut event = DetectionEvent::new(DisruptionType::Cancellation, Severity::Low);
    event.delay_minutes = None;
    event.affected_routes = vec!["46A".to_string()];
    event.affected_area = Some("City Centre".to_string());
    event
}

fn processed(outcome: DetectionOutcome) -> detour_core::PipelineReport {
    match outcome {
        DetectionOutcome::Processed(report) => *report,
        other => panic!("expected a processed outcome, got {other:?}"),
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _solution: &CompiledSolution,
        _priority: NotificationPriority,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("push gateway unavailable".to_string()))
    }
}

struct BrokenSource;

impl CandidateSource for BrokenSource {
    fn candidates(
        &self,
        _record: &DisruptionRecord,
        _directory: &dyn StopDirectory,
    ) -> detour_core::Result<Vec<RouteCandidate>> {
        Err(DetourError::Config("scenario feed missing".to_string()))
    }
}

struct FixedSource(Vec<RouteCandidate>);

impl CandidateSource for FixedSource {
    fn candidates(
        &self,
        _record: &DisruptionRecord,
        _directory: &dyn StopDirectory,
    ) -> detour_core::Result<Vec<RouteCandidate>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn cancellation_in_city_centre_reaches_active() {
    let orch = memory_orchestrator();
    let report = processed(
        orch.handle_detection(city_centre_cancellation())
            .await
            .unwrap(),
    );

    assert!(report
        .verdict
        .triggers
        .contains(&detour_core::AdmissionTrigger::Cancellation));
    assert_eq!(report.record.status, DisruptionStatus::Active);
    assert!(report.record.notification_sent.is_some());
    assert_eq!(report.priority, NotificationPriority::Immediate);
    assert!(report.solution.primary.is_some());
    assert_eq!(
        report.solution.affected_user_groups,
        vec!["Commuters on routes: 46A", "General Public"]
    );

    // Routes 10 + area hub 20 + cancellation 10.
    assert_eq!(report.record.severity, Severity::Medium);

    let stored = orch.record(&report.record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DisruptionStatus::Active);
    assert_eq!(stored.notification_sent, Some(true));
}

#[tokio::test]
async fn notifying_entry_precedes_activation() {
    let orch = memory_orchestrator();
    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());
    let history = orch.history(&report.record.id);

    let notifying = history
        .iter()
        .position(|e| e.stage == Stage::Notification)
        .unwrap();
    let active = history
        .iter()
        .position(|e| e.stage == Stage::Activation)
        .unwrap();
    assert!(notifying < active);
    assert!(history.iter().all(|e| e.disruption_id == report.record.id));
}

#[tokio::test]
async fn failing_notifier_still_reaches_active() {
    let orch = Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
        .notifier(Arc::new(FailingNotifier))
        .build();
    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());

    assert_eq!(report.record.status, DisruptionStatus::Active);
    assert_eq!(report.record.notification_sent, Some(false));
    let stored = orch.record(&report.record.id).await.unwrap().unwrap();
    assert_eq!(stored.notification_sent, Some(false));
    assert!(orch
        .history(&report.record.id)
        .iter()
        .any(|e| e.message.contains("Notification failed")));
}

#[tokio::test]
async fn generation_failure_leaves_record_analyzing() {
    let repository = Arc::new(MemoryDisruptionRepository::new());
    let orch = Orchestrator::builder(repository.clone())
        .candidate_source(Arc::new(BrokenSource))
        .build();

    let err = orch
        .handle_detection(city_centre_cancellation())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DetourError::Pipeline {
            stage: Stage::Analysis,
            ..
        }
    ));

    let records = repository.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, DisruptionStatus::Analyzing);
    assert_eq!(records[0].notification_sent, None);
    let last = orch.history(&records[0].id).pop().unwrap();
    assert_eq!(last.stage, Stage::Failure);
}

#[tokio::test]
async fn injected_scenario_drives_the_solution() {
    let candidates = vec![
        RouteCandidate::new("slow", "Walk", "Walk along the quays")
            .with_time(60)
            .with_walking(3000),
        RouteCandidate::new("fast", "Metro", "Metro Line 1")
            .with_time(12)
            .with_walking(80),
    ];
    let orch = Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
        .candidate_source(Arc::new(FixedSource(candidates)))
        .build();

    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());
    let primary = report.solution.primary.unwrap();
    assert_eq!(primary.id, "fast");
    assert_eq!(primary.score, 100);
    assert_eq!(report.solution.secondary.len(), 1);
    assert_eq!(
        report.solution.action_summary,
        "Metro instead. Route: Metro Line 1. Estimated time: 12 minutes"
    );
}

#[tokio::test]
async fn empty_scenario_still_notifies() {
    let orch = Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
        .candidate_source(Arc::new(FixedSource(Vec::new())))
        .build();
    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());
    assert!(report.solution.primary.is_none());
    assert_eq!(report.record.status, DisruptionStatus::Active);
}

#[tokio::test]
async fn resolving_unknown_id_returns_false() {
    let orch = memory_orchestrator();
    assert!(!orch.resolve(&DisruptionId::from("nope")).await.unwrap());
    assert!(!orch.cancel(&DisruptionId::from("nope"), "n/a").await.unwrap());
}

#[tokio::test]
async fn journal_for_unknown_id_is_empty() {
    let orch = memory_orchestrator();
    assert!(orch.history(&DisruptionId::from("nope")).is_empty());
}

#[tokio::test]
async fn cancel_from_active_then_resolve_is_rejected() {
    let orch = memory_orchestrator();
    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());
    let id = report.record.id;

    assert!(orch.cancel(&id, "service restored early").await.unwrap());
    let stored = orch.record(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, DisruptionStatus::Cancelled);
    assert!(orch
        .history(&id)
        .iter()
        .any(|e| e.stage == Stage::Cancellation && e.message.contains("restored early")));

    let err = orch.resolve(&id).await.unwrap_err();
    assert!(matches!(err, DetourError::InvalidTransition { .. }));
    let err = orch.cancel(&id, "again").await.unwrap_err();
    assert!(matches!(err, DetourError::InvalidTransition { .. }));
}

#[tokio::test]
async fn duplicates_are_kept_unless_dedupe_is_enabled() {
    let mut event = city_centre_cancellation();
    event.source_reference_id = Some("feed-42".to_string());

    let plain = memory_orchestrator();
    plain.handle_detection(event.clone()).await.unwrap();
    plain.handle_detection(event.clone()).await.unwrap();
    assert_eq!(
        plain
            .repository()
            .find_by_source_reference("feed-42")
            .await
            .unwrap()
            .len(),
        2
    );

    let mut config = DetourConfig::default();
    config.pipeline.dedupe_by_source_reference = true;
    let deduping = Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
        .config(config)
        .build();
    let first = processed(deduping.handle_detection(event.clone()).await.unwrap());
    match deduping.handle_detection(event.clone()).await.unwrap() {
        DetectionOutcome::Duplicate { existing } => assert_eq!(existing, first.record.id),
        other => panic!("expected duplicate, got {other:?}"),
    }

    // A resolved record no longer absorbs new detections.
    deduping.resolve(&first.record.id).await.unwrap();
    let again = deduping.handle_detection(event).await.unwrap();
    assert!(again.report().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_detections_do_not_cross_contaminate() {
    let journal = Arc::new(IncidentJournal::new());
    let orch = Arc::new(
        Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
            .journal(journal.clone())
            .build(),
    );

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move {
                let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Medium);
                event.delay_minutes = Some(10 + i);
                event.affected_routes = vec![format!("R{i}")];
                processed(orch.handle_detection(event).await.unwrap())
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.record.status, DisruptionStatus::Active);
        ids.push(report.record.id);
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    for id in &ids {
        let history = journal.read_all(id);
        assert_eq!(history.len(), 6);
        assert!(history.iter().all(|e| &e.disruption_id == id));
    }
    assert_eq!(journal.count(), 16 * 6);
}

#[tokio::test]
async fn queue_notifier_receives_compiled_solution() {
    let (notifier, mut rx) = QueueNotifier::channel(8);
    let orch = Orchestrator::builder(Arc::new(MemoryDisruptionRepository::new()))
        .notifier(Arc::new(notifier))
        .build();

    let report = processed(orch.handle_detection(city_centre_cancellation()).await.unwrap());
    let queued = rx.recv().await.unwrap();
    assert_eq!(queued.solution.disruption_id, report.record.id);
    assert_eq!(queued.priority, NotificationPriority::Immediate);
}

#[tokio::test]
async fn pipeline_runs_against_surreal_repository() {
    let repository = Arc::new(SurrealDisruptionRepository::in_memory().await.unwrap());
    let orch = Orchestrator::builder(repository.clone()).build();

    let mut event = city_centre_cancellation();
    event.affected_transport_modes = vec![TransportMode::Tram];
    let report = processed(orch.handle_detection(event).await.unwrap());

    let active = repository
        .find_by_status(DisruptionStatus::Active)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, report.record.id);

    assert!(orch.resolve(&report.record.id).await.unwrap());
    let stored = repository.find_by_id(&report.record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DisruptionStatus::Resolved);
    assert!(stored.resolved_at.is_some());
}
