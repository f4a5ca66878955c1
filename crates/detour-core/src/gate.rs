//! Admission gate and severity scoring.
//!
//! [`ThresholdGate::admit`] decides whether a detection is worth acting on.
//! Triggers use OR semantics: any single one admits the event, and the
//! [`AdmissionVerdict`] lists every trigger that fired. Events with no
//! trigger are dropped silently by the caller.
//!
//! Severity is an additive score over delay, route count, hub exposure and
//! disruption type, bucketed into [`Severity`] tiers. Every function here is
//! pure; re-running them has no side effects.

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::domain::{DetectionEvent, DisruptionRecord, DisruptionType, Severity};

// ---------------------------------------------------------------------------
// Signals shared by events and records
// ---------------------------------------------------------------------------

/// The fields admission and severity scoring look at.
pub trait DisruptionSignals {
    fn delay_minutes(&self) -> Option<u32>;
    fn affected_routes(&self) -> &[String];
    fn affected_stops(&self) -> &[String];
    fn affected_area(&self) -> Option<&str>;
    fn disruption_type(&self) -> DisruptionType;
}

impl DisruptionSignals for DetectionEvent {
    fn delay_minutes(&self) -> Option<u32> {
        self.delay()
    }

    fn affected_routes(&self) -> &[String] {
        &self.affected_routes
    }

    fn affected_stops(&self) -> &[String] {
        &self.affected_stops
    }

    fn affected_area(&self) -> Option<&str> {
        self.affected_area.as_deref()
    }

    fn disruption_type(&self) -> DisruptionType {
        self.disruption_type
    }
}

impl DisruptionSignals for DisruptionRecord {
    fn delay_minutes(&self) -> Option<u32> {
        self.delay_minutes
    }

    fn affected_routes(&self) -> &[String] {
        &self.affected_routes
    }

    fn affected_stops(&self) -> &[String] {
        &self.affected_stops
    }

    fn affected_area(&self) -> Option<&str> {
        self.location.area.as_deref()
    }

    fn disruption_type(&self) -> DisruptionType {
        self.disruption_type
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// A single reason an event was admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdmissionTrigger {
    /// Delay met the admission threshold.
    Delay { minutes: u32 },
    /// At least one route is affected.
    AffectedRoutes { count: usize },
    /// Source reported severity above LOW.
    ReportedSeverity { severity: Severity },
    /// Area or a stop matched a hub keyword.
    Hub { keyword: String },
    /// Service was cancelled outright.
    Cancellation,
}

impl std::fmt::Display for AdmissionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionTrigger::Delay { minutes } => write!(f, "delay {minutes} min"),
            AdmissionTrigger::AffectedRoutes { count } => write!(f, "{count} route(s) affected"),
            AdmissionTrigger::ReportedSeverity { severity } => {
                write!(f, "reported severity {severity}")
            }
            AdmissionTrigger::Hub { keyword } => write!(f, "hub '{keyword}'"),
            AdmissionTrigger::Cancellation => f.write_str("cancellation"),
        }
    }
}

/// Outcome of running the admission rules over one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionVerdict {
    /// Triggers that fired (empty when the event is dropped).
    pub triggers: Vec<AdmissionTrigger>,
}

impl AdmissionVerdict {
    pub fn admitted(&self) -> bool {
        !self.triggers.is_empty()
    }

    /// Comma-separated trigger list for journaling.
    pub fn describe(&self) -> String {
        self.triggers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

const CRITICAL_FLOOR: u32 = 70;
const HIGH_FLOOR: u32 = 50;
const MEDIUM_FLOOR: u32 = 30;

/// Admission control and severity scoring.
#[derive(Debug, Clone, Default)]
pub struct ThresholdGate {
    config: GateConfig,
}

impl ThresholdGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether the event should be acted on.
    pub fn evaluate(&self, event: &DetectionEvent) -> bool {
        self.admit(event).admitted()
    }

    /// Run every admission rule and collect the triggers that fired.
    pub fn admit(&self, event: &DetectionEvent) -> AdmissionVerdict {
        let mut triggers = Vec::new();

        if let Some(minutes) = event.delay() {
            if minutes >= self.config.admission_delay_minutes {
                triggers.push(AdmissionTrigger::Delay { minutes });
            }
        }
        if !event.affected_routes.is_empty() {
            triggers.push(AdmissionTrigger::AffectedRoutes {
                count: event.affected_routes.len(),
            });
        }
        if event.severity != Severity::Low {
            triggers.push(AdmissionTrigger::ReportedSeverity {
                severity: event.severity,
            });
        }
        if let Some(keyword) = self.matched_hub(event) {
            triggers.push(AdmissionTrigger::Hub { keyword });
        }
        if event.disruption_type == DisruptionType::Cancellation {
            triggers.push(AdmissionTrigger::Cancellation);
        }

        AdmissionVerdict { triggers }
    }

    /// Additive severity score before bucketing.
    pub fn severity_score(&self, signals: &impl DisruptionSignals) -> u32 {
        let delay_points = match signals.delay_minutes() {
            Some(d) if d >= 30 => 40,
            Some(d) if d >= 20 => 30,
            Some(d) if d >= 10 => 20,
            Some(_) => 10,
            None => 0,
        };

        let route_points = match signals.affected_routes().len() {
            n if n >= 5 => 30,
            n if n >= 3 => 20,
            n if n >= 1 => 10,
            _ => 0,
        };

        let mut hub_points = 0;
        if self.area_is_hub(signals.affected_area()) {
            hub_points += 20;
        }
        if self.any_stop_is_hub(signals.affected_stops()) {
            hub_points += 10;
        }

        let type_points = if signals.disruption_type() == DisruptionType::Cancellation {
            10
        } else {
            0
        };

        delay_points + route_points + hub_points + type_points
    }

    /// Severity tier computed from the record's own fields.
    pub fn calculate_severity(&self, signals: &impl DisruptionSignals) -> Severity {
        match self.severity_score(signals) {
            s if s >= CRITICAL_FLOOR => Severity::Critical,
            s if s >= HIGH_FLOOR => Severity::High,
            s if s >= MEDIUM_FLOOR => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Whether notification should be escalated. Never used for admission.
    pub fn requires_immediate_action(&self, record: &DisruptionRecord) -> bool {
        self.calculate_severity(record) == Severity::Critical
            || record.disruption_type == DisruptionType::Cancellation
            || self.area_is_hub(record.location.area.as_deref())
            || self.any_stop_is_hub(&record.affected_stops)
            || record
                .delay_minutes
                .is_some_and(|d| d >= self.config.immediate_action_delay_minutes)
    }

    // -- hub matching --------------------------------------------------------

    fn hub_keyword_in(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.config
            .hub_keywords
            .iter()
            .find(|keyword| text.contains(&keyword.to_lowercase()))
            .map(String::as_str)
    }

    fn area_is_hub(&self, area: Option<&str>) -> bool {
        area.and_then(|a| self.hub_keyword_in(a)).is_some()
    }

    fn any_stop_is_hub(&self, stops: &[String]) -> bool {
        stops.iter().any(|stop| self.hub_keyword_in(stop).is_some())
    }

    fn matched_hub(&self, event: &DetectionEvent) -> Option<String> {
        event
            .affected_area
            .as_deref()
            .and_then(|area| self.hub_keyword_in(area))
            .or_else(|| {
                event
                    .affected_stops
                    .iter()
                    .find_map(|stop| self.hub_keyword_in(stop))
            })
            .map(str::to_string)
    }
}
