//! Multi-factor candidate scoring and ranking.
//!
//! Four independently capped factors are summed into a 0–100 score:
//!
//! | factor      | points                                          |
//! |-------------|-------------------------------------------------|
//! | time        | ≤20 min 30, ≤35 min 20, ≤50 min 10, else 0      |
//! | transfers   | 0 → 20, 1 → 15, 2 → 10, else 0                  |
//! | walking     | ≤200 m 20, ≤500 m 15, ≤1000 m 10, else 0        |
//! | reliability | first mode keyword found in the label, see table |
//!
//! Mode labels may be compound ("Metro + Bus"), so reliability is matched by
//! case-insensitive substring in table order rather than by exact mode.

use crate::domain::{RouteCandidate, TransportMode};

/// Reliability points per mode, in match priority order.
pub const RELIABILITY_TABLE: [(TransportMode, u8); 4] = [
    (TransportMode::Metro, 30),
    (TransportMode::Tram, 25),
    (TransportMode::Bus, 20),
    (TransportMode::Walk, 15),
];

/// Reliability points for a (possibly compound) mode label.
pub fn reliability_points(mode_label: &str) -> u8 {
    let label = mode_label.to_uppercase();
    RELIABILITY_TABLE
        .iter()
        .find(|(mode, _)| label.contains(&mode.label().to_uppercase()))
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

fn time_points(minutes: u32) -> u8 {
    match minutes {
        0..=20 => 30,
        21..=35 => 20,
        36..=50 => 10,
        _ => 0,
    }
}

fn transfer_points(transfers: u32) -> u8 {
    match transfers {
        0 => 20,
        1 => 15,
        2 => 10,
        _ => 0,
    }
}

fn walking_points(meters: u32) -> u8 {
    match meters {
        0..=200 => 20,
        201..=500 => 15,
        501..=1000 => 10,
        _ => 0,
    }
}

/// Stateless scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteScorer;

impl RouteScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a single candidate. Always within 0..=100.
    pub fn score(&self, candidate: &RouteCandidate) -> u8 {
        time_points(candidate.estimated_time_minutes)
            + transfer_points(candidate.transfer_count)
            + walking_points(candidate.walking_distance_m)
            + reliability_points(&candidate.mode)
    }

    /// Fill in `score` on every candidate.
    pub fn score_all(&self, mut candidates: Vec<RouteCandidate>) -> Vec<RouteCandidate> {
        for candidate in &mut candidates {
            candidate.score = self.score(candidate);
        }
        candidates
    }

    /// Stable sort by score, best first, with `rank` and `recommended` set.
    ///
    /// Candidates with equal scores keep their input order.
    pub fn rank(&self, candidates: &[RouteCandidate]) -> Vec<RouteCandidate> {
        let mut ranked = candidates.to_vec();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        for (i, candidate) in ranked.iter_mut().enumerate() {
            candidate.rank = i as u32 + 1;
            candidate.recommended = i == 0;
        }
        ranked
    }

    /// The candidate `rank` would put first, or `None` for an empty slice.
    pub fn select_best(&self, candidates: &[RouteCandidate]) -> Option<RouteCandidate> {
        self.rank(candidates).into_iter().next()
    }
}
