//! Compiled recommendation package handed to the notification collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use detour_state::{DisruptionId, DisruptionType, Severity};

use super::candidate::RouteCandidate;

/// How urgently a solution should be pushed to riders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Immediate,
    Normal,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationPriority::Immediate => f.write_str("immediate"),
            NotificationPriority::Normal => f.write_str("normal"),
        }
    }
}

/// Final ranked and annotated recommendation for one disruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSolution {
    pub disruption_id: DisruptionId,
    pub disruption_type: DisruptionType,
    pub severity: Severity,
    pub area: Option<String>,
    /// Every evaluated candidate, best first
    pub ranked_candidates: Vec<RouteCandidate>,
    pub primary: Option<RouteCandidate>,
    pub secondary: Vec<RouteCandidate>,
    pub action_summary: String,
    pub instructions: Vec<String>,
    pub estimated_impact: String,
    pub calculated_at: DateTime<Utc>,
    pub calculation_method: String,
    pub options_evaluated: usize,
    pub ready_for_notification: bool,
    pub affected_user_groups: Vec<String>,
}

impl CompiledSolution {
    pub fn has_alternatives(&self) -> bool {
        self.primary.is_some()
    }
}
