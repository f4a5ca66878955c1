//! Inbound detection events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use detour_state::{
    DisruptionId, DisruptionRecord, DisruptionStatus, DisruptionType, Location, Severity,
    TransportMode,
};

use super::error::ValidationError;

/// A disruption report from an external detection source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub disruption_type: DisruptionType,
    /// Severity as judged by the source; only used for admission
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub affected_area: Option<String>,
    #[serde(default)]
    pub affected_transport_modes: Vec<TransportMode>,
    #[serde(default)]
    pub affected_routes: Vec<String>,
    #[serde(default)]
    pub affected_stops: Vec<String>,
    /// Defaults to intake time when absent
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delay_minutes: Option<i64>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub source_reference_id: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub construction_project: Option<String>,
    #[serde(default)]
    pub traffic_congestion_level: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl DetectionEvent {
    /// Minimal event of the given type and reported severity.
    pub fn new(disruption_type: DisruptionType, severity: Severity) -> Self {
        Self {
            disruption_type,
            severity,
            description: String::new(),
            latitude: None,
            longitude: None,
            affected_area: None,
            affected_transport_modes: Vec::new(),
            affected_routes: Vec::new(),
            affected_stops: Vec::new(),
            detected_at: None,
            estimated_start_time: None,
            estimated_end_time: None,
            delay_minutes: None,
            data_source: None,
            source_reference_id: None,
            event_name: None,
            construction_project: None,
            traffic_congestion_level: None,
            additional_notes: None,
        }
    }

    /// Reject malformed reports before they reach the gate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || lat.is_nan() {
                    return Err(ValidationError::LatitudeOutOfRange(lat));
                }
                if !(-180.0..=180.0).contains(&lon) || lon.is_nan() {
                    return Err(ValidationError::LongitudeOutOfRange(lon));
                }
            }
            (None, None) => {}
            _ => return Err(ValidationError::PartialCoordinates),
        }

        if let Some(delay) = self.delay_minutes {
            if delay < 0 {
                return Err(ValidationError::NegativeDelay(delay));
            }
        }

        if let (Some(start), Some(end)) = (self.estimated_start_time, self.estimated_end_time) {
            if end < start {
                return Err(ValidationError::EndBeforeStart);
            }
        }

        if self.affected_routes.iter().any(|r| r.trim().is_empty()) {
            return Err(ValidationError::BlankEntry {
                field: "affected_routes",
            });
        }
        if self.affected_stops.iter().any(|s| s.trim().is_empty()) {
            return Err(ValidationError::BlankEntry {
                field: "affected_stops",
            });
        }

        Ok(())
    }

    /// Delay as an unsigned minute count. Negative values clamp to zero.
    pub fn delay(&self) -> Option<u32> {
        self.delay_minutes
            .map(|d| d.clamp(0, i64::from(u32::MAX)) as u32)
    }

    /// Display name: the event name when given, otherwise derived from
    /// type and the most specific location available.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.event_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let place = self
            .affected_area
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.affected_routes
                    .first()
                    .map(|route| format!("route {route}"))
            })
            .unwrap_or_else(|| "network".to_string());
        format!("{} - {}", self.disruption_type, place)
    }

    /// Build the persisted record for an admitted event.
    ///
    /// Severity is seeded with the reported value; the orchestrator replaces
    /// it with the computed tier before the record is stored.
    pub fn into_record(self, id: DisruptionId, now: DateTime<Utc>) -> DisruptionRecord {
        let name = self.display_name();
        let delay_minutes = self.delay();
        DisruptionRecord {
            id,
            name,
            description: self.description,
            status: DisruptionStatus::Detected,
            disruption_type: self.disruption_type,
            severity: self.severity,
            reported_severity: self.severity,
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
                area: self.affected_area,
            },
            affected_transport_modes: self.affected_transport_modes,
            affected_routes: self.affected_routes,
            affected_stops: self.affected_stops,
            detected_at: self.detected_at.unwrap_or(now),
            start_time: self.estimated_start_time,
            estimated_end_time: self.estimated_end_time,
            resolved_at: None,
            delay_minutes,
            data_source: self.data_source,
            source_reference_id: self.source_reference_id,
            notification_sent: None,
            event_name: self.event_name,
            construction_project: self.construction_project,
            traffic_congestion_level: self.traffic_congestion_level,
            additional_notes: self.additional_notes,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_coordinates_rejected() {
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Low);
        event.latitude = Some(53.3);
        assert_eq!(event.validate(), Err(ValidationError::PartialCoordinates));
    }

    #[test]
    fn negative_delay_rejected() {
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Low);
        event.delay_minutes = Some(-1);
        assert_eq!(event.validate(), Err(ValidationError::NegativeDelay(-1)));
    }

    #[test]
    fn end_before_start_rejected() {
        let mut event = DetectionEvent::new(DisruptionType::Construction, Severity::Medium);
        let start = Utc::now();
        event.estimated_start_time = Some(start);
        event.estimated_end_time = Some(start - chrono::Duration::hours(1));
        assert_eq!(event.validate(), Err(ValidationError::EndBeforeStart));
    }

    #[test]
    fn blank_route_rejected() {
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Low);
        event.affected_routes = vec!["46A".to_string(), "  ".to_string()];
        assert!(matches!(
            event.validate(),
            Err(ValidationError::BlankEntry { .. })
        ));
    }

    #[test]
    fn display_name_prefers_event_name_then_area_then_route() {
        let mut event = DetectionEvent::new(DisruptionType::Cancellation, Severity::Low);
        event.affected_routes = vec!["46A".to_string()];
        assert_eq!(event.display_name(), "CANCELLATION - route 46A");

        event.affected_area = Some("City Centre".to_string());
        assert_eq!(event.display_name(), "CANCELLATION - City Centre");

        event.event_name = Some("Marathon".to_string());
        assert_eq!(event.display_name(), "Marathon");
    }

    #[test]
    fn deserializes_minimal_payload() {
        let event: DetectionEvent = serde_json::from_str(
            r#"{"disruption_type":"DELAY","severity":"HIGH","delay_minutes":12}"#,
        )
        .unwrap();
        assert_eq!(event.delay(), Some(12));
        assert!(event.affected_routes.is_empty());
    }

    #[test]
    fn into_record_starts_detected() {
        let now = Utc::now();
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::High);
        event.delay_minutes = Some(25);
        let record = event.into_record(DisruptionId::from("d-1"), now);
        assert_eq!(record.status, DisruptionStatus::Detected);
        assert_eq!(record.delay_minutes, Some(25));
        assert_eq!(record.detected_at, now);
        assert!(record.notification_sent.is_none());
    }
}
