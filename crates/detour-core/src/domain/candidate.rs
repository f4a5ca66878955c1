//! Alternative route candidates.

use serde::{Deserialize, Serialize};

/// One proposed alternative route for affected riders.
///
/// Candidates are produced fresh on every pipeline run and only outlive it
/// when embedded in a [`super::CompiledSolution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Stable within one run (e.g. `bus-alt-2`)
    pub id: String,
    /// Mode label; may be compound ("Metro + Bus")
    pub mode: String,
    /// Human route name; multi-leg names join legs with `→` or `+`
    pub route_name: String,
    /// Ordered legs or stops
    pub legs: Vec<String>,
    pub estimated_time_minutes: u32,
    /// Extra time compared with the undisrupted journey
    pub additional_time_minutes: u32,
    pub distance_km: f64,
    pub cost: f64,
    /// 1 to 10
    pub comfort: u8,
    /// 1 to 10
    pub reliability: u8,
    /// 1 to 10, higher is more crowded
    pub crowding: u8,
    /// 0 to 100, set by the scorer
    pub score: u8,
    /// 1-based position after ranking; 0 before ranking
    pub rank: u32,
    pub recommended: bool,
    pub walking_distance_m: u32,
    pub transfer_count: u32,
    pub description: String,
    pub notes: Option<String>,
}

impl RouteCandidate {
    /// Bare candidate with neutral ratings; used by scenario providers and tests.
    pub fn new(
        id: impl Into<String>,
        mode: impl Into<String>,
        route_name: impl Into<String>,
    ) -> Self {
        let route_name = route_name.into();
        Self {
            id: id.into(),
            mode: mode.into(),
            legs: vec![route_name.clone()],
            route_name,
            estimated_time_minutes: 0,
            additional_time_minutes: 0,
            distance_km: 0.0,
            cost: 0.0,
            comfort: 5,
            reliability: 5,
            crowding: 5,
            score: 0,
            rank: 0,
            recommended: false,
            walking_distance_m: 0,
            transfer_count: 0,
            description: String::new(),
            notes: None,
        }
    }

    pub fn with_time(mut self, minutes: u32) -> Self {
        self.estimated_time_minutes = minutes;
        self
    }

    pub fn with_transfers(mut self, transfers: u32) -> Self {
        self.transfer_count = transfers;
        self
    }

    pub fn with_walking(mut self, meters: u32) -> Self {
        self.walking_distance_m = meters;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the route name describes more than one leg.
    pub fn is_multi_leg(&self) -> bool {
        self.route_name.contains(LEG_DELIMITERS)
    }

    /// Route name split into trimmed, non-empty legs.
    pub fn name_legs(&self) -> Vec<&str> {
        self.route_name
            .split(LEG_DELIMITERS)
            .map(str::trim)
            .filter(|leg| !leg.is_empty())
            .collect()
    }
}

/// Delimiters separating legs in a route name.
pub const LEG_DELIMITERS: [char; 2] = ['→', '+'];
