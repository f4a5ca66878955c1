//! Disruption record model.
//!
//! A [`DisruptionRecord`] is created once a detection passes admission and is
//! then mutated only by the orchestrator (status transitions, severity,
//! notification flag) and by resolution/cancellation. Records are never
//! deleted by the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a disruption record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisruptionId(pub String);

impl DisruptionId {
    /// Generate a new random DisruptionId
    pub fn new() -> Self {
        DisruptionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisruptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DisruptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DisruptionId {
    fn from(s: &str) -> Self {
        DisruptionId(s.to_string())
    }
}

/// Lifecycle status of a disruption.
///
/// Pipeline order: `Detected → Analyzing → Notifying → Active → Resolved`.
/// `Resolved` and `Cancelled` are terminal and reachable from any
/// non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisruptionStatus {
    Detected,
    Analyzing,
    Notifying,
    Active,
    Resolved,
    Cancelled,
}

impl DisruptionStatus {
    pub const ALL: [DisruptionStatus; 6] = [
        DisruptionStatus::Detected,
        DisruptionStatus::Analyzing,
        DisruptionStatus::Notifying,
        DisruptionStatus::Active,
        DisruptionStatus::Resolved,
        DisruptionStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DisruptionStatus::Detected => "DETECTED",
            DisruptionStatus::Analyzing => "ANALYZING",
            DisruptionStatus::Notifying => "NOTIFYING",
            DisruptionStatus::Active => "ACTIVE",
            DisruptionStatus::Resolved => "RESOLVED",
            DisruptionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further transition is permitted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DisruptionStatus::Resolved | DisruptionStatus::Cancelled
        )
    }

    /// Whether `self → next` is a legal forward step.
    pub fn can_transition_to(self, next: DisruptionStatus) -> bool {
        use DisruptionStatus::*;
        match (self, next) {
            (from, Resolved | Cancelled) => !from.is_terminal(),
            (Detected, Analyzing) | (Analyzing, Notifying) | (Notifying, Active) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DisruptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DisruptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisruptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown disruption status: {s}"))
    }
}

/// Severity tier. Ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
        .into_iter()
        .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown severity: {s}"))
    }
}

/// Classification reported by the detection source.
///
/// Decoding is case-insensitive; unrecognised names become `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum DisruptionType {
    Delay,
    Cancellation,
    Construction,
    Accident,
    Event,
    Weather,
    Congestion,
    TechnicalFault,
    Other,
}

impl DisruptionType {
    pub const ALL: [DisruptionType; 9] = [
        DisruptionType::Delay,
        DisruptionType::Cancellation,
        DisruptionType::Construction,
        DisruptionType::Accident,
        DisruptionType::Event,
        DisruptionType::Weather,
        DisruptionType::Congestion,
        DisruptionType::TechnicalFault,
        DisruptionType::Other,
    ];

    /// Lenient lookup by name; never fails.
    pub fn parse(raw: &str) -> Self {
        let name = normalize_name(raw);
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == name)
            .unwrap_or(DisruptionType::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisruptionType::Delay => "DELAY",
            DisruptionType::Cancellation => "CANCELLATION",
            DisruptionType::Construction => "CONSTRUCTION",
            DisruptionType::Accident => "ACCIDENT",
            DisruptionType::Event => "EVENT",
            DisruptionType::Weather => "WEATHER",
            DisruptionType::Congestion => "CONGESTION",
            DisruptionType::TechnicalFault => "TECHNICAL_FAULT",
            DisruptionType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for DisruptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<String> for DisruptionType {
    fn from(raw: String) -> Self {
        DisruptionType::parse(&raw)
    }
}

/// Upper-case a wire name and fold `-` and spaces into `_`.
fn normalize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// A single transport mode affected by a disruption.
///
/// Decoding is case-insensitive. Modes outside the known set decode as
/// `Other` and get generic alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum TransportMode {
    Bus,
    Tram,
    Metro,
    Train,
    Ferry,
    Walk,
    Other,
}

impl TransportMode {
    pub const ALL: [TransportMode; 7] = [
        TransportMode::Bus,
        TransportMode::Tram,
        TransportMode::Metro,
        TransportMode::Train,
        TransportMode::Ferry,
        TransportMode::Walk,
        TransportMode::Other,
    ];

    /// Lenient lookup by name; never fails.
    pub fn parse(raw: &str) -> Self {
        let name = normalize_name(raw);
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .unwrap_or(TransportMode::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Bus => "BUS",
            TransportMode::Tram => "TRAM",
            TransportMode::Metro => "METRO",
            TransportMode::Train => "TRAIN",
            TransportMode::Ferry => "FERRY",
            TransportMode::Walk => "WALK",
            TransportMode::Other => "OTHER",
        }
    }

    /// Human-facing label used in candidate names and summaries.
    pub fn label(self) -> &'static str {
        match self {
            TransportMode::Bus => "Bus",
            TransportMode::Tram => "Tram",
            TransportMode::Metro => "Metro",
            TransportMode::Train => "Train",
            TransportMode::Ferry => "Ferry",
            TransportMode::Walk => "Walk",
            TransportMode::Other => "Transit",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for TransportMode {
    fn from(raw: String) -> Self {
        TransportMode::parse(&raw)
    }
}

/// Where a disruption is happening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Free-text area description (e.g. "City Centre", "Airport Road")
    pub area: Option<String>,
}

impl Location {
    /// Both coordinates, when present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Persistent disruption record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisruptionRecord {
    pub id: DisruptionId,
    pub name: String,
    pub description: String,
    pub status: DisruptionStatus,
    pub disruption_type: DisruptionType,
    /// Severity computed from the record's own fields
    pub severity: Severity,
    /// Severity as reported by the detection source
    pub reported_severity: Severity,
    pub location: Location,
    /// Ordered; the first entry drives candidate generation
    pub affected_transport_modes: Vec<TransportMode>,
    pub affected_routes: Vec<String>,
    pub affected_stops: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub estimated_end_time: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub delay_minutes: Option<u32>,
    pub data_source: Option<String>,
    pub source_reference_id: Option<String>,
    /// `None` until the notification stage has run
    pub notification_sent: Option<bool>,
    pub event_name: Option<String>,
    pub construction_project: Option<String>,
    pub traffic_congestion_level: Option<String>,
    pub additional_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DisruptionRecord {
    /// Primary mode driving candidate generation, defaulting to bus.
    pub fn primary_mode(&self) -> TransportMode {
        self.affected_transport_modes
            .first()
            .copied()
            .unwrap_or(TransportMode::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_transitions_are_single_step() {
        use DisruptionStatus::*;
        assert!(Detected.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Notifying));
        assert!(Notifying.can_transition_to(Active));
        assert!(!Detected.can_transition_to(Active));
        assert!(!Active.can_transition_to(Detected));
        assert!(!Analyzing.can_transition_to(Detected));
    }

    #[test]
    fn terminal_states_reachable_from_any_open_state() {
        use DisruptionStatus::*;
        for from in [Detected, Analyzing, Notifying, Active] {
            assert!(from.can_transition_to(Resolved));
            assert!(from.can_transition_to(Cancelled));
        }
        assert!(!Resolved.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(Resolved));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn status_serde_uses_upper_case() {
        let json = serde_json::to_string(&DisruptionStatus::Notifying).unwrap();
        assert_eq!(json, "\"NOTIFYING\"");
        let back: DisruptionStatus = "active".parse().unwrap();
        assert_eq!(back, DisruptionStatus::Active);
    }

    #[test]
    fn transport_mode_deserializes_from_upper_case() {
        let modes: Vec<TransportMode> = serde_json::from_str(r#"["METRO","BUS"]"#).unwrap();
        assert_eq!(modes, vec![TransportMode::Metro, TransportMode::Bus]);
    }

    #[test]
    fn unknown_or_mixed_case_names_decode_leniently() {
        let modes: Vec<TransportMode> =
            serde_json::from_str(r#"["Bus","RAIL","luas","tram"]"#).unwrap();
        assert_eq!(
            modes,
            vec![
                TransportMode::Bus,
                TransportMode::Other,
                TransportMode::Other,
                TransportMode::Tram
            ]
        );
        assert_eq!(
            serde_json::to_string(&TransportMode::Other).unwrap(),
            "\"OTHER\""
        );

        let types: Vec<DisruptionType> =
            serde_json::from_str(r#"["technical-fault","Strike","cancellation"]"#).unwrap();
        assert_eq!(
            types,
            vec![
                DisruptionType::TechnicalFault,
                DisruptionType::Other,
                DisruptionType::Cancellation
            ]
        );
    }
}
