//! Alternative route candidate generation.
//!
//! Dispatch is keyed on the record's primary [`TransportMode`] through an
//! explicit profile table; each profile names a builder, a fallback delay
//! used when the detection carried none, and the undisrupted journey time
//! that additional-time figures are measured against.
//!
//! Generation is a pure function of the record and the directory snapshot.
//! A directory miss only changes descriptive text, never the candidate set.

use crate::directory::StopDirectory;
use crate::domain::{DisruptionRecord, Result, RouteCandidate, TransportMode};

// ---------------------------------------------------------------------------
// Scenario seam
// ---------------------------------------------------------------------------

/// Produces candidates for a record. The orchestrator only sees this trait,
/// so tests can inject fixed scenarios.
pub trait CandidateSource: Send + Sync {
    fn candidates(
        &self,
        record: &DisruptionRecord,
        directory: &dyn StopDirectory,
    ) -> Result<Vec<RouteCandidate>>;
}

// ---------------------------------------------------------------------------
// Mode profiles
// ---------------------------------------------------------------------------

type Builder = fn(&BuildContext<'_>) -> Vec<RouteCandidate>;

struct ModeProfile {
    mode: TransportMode,
    id_prefix: &'static str,
    builder: Builder,
    default_delay_minutes: u32,
    normal_journey_minutes: u32,
}

static PROFILES: [ModeProfile; 7] = [
    ModeProfile {
        mode: TransportMode::Bus,
        id_prefix: "bus-alt",
        builder: bus_alternatives,
        default_delay_minutes: 15,
        normal_journey_minutes: 20,
    },
    ModeProfile {
        mode: TransportMode::Tram,
        id_prefix: "tram-alt",
        builder: tram_alternatives,
        default_delay_minutes: 10,
        normal_journey_minutes: 18,
    },
    ModeProfile {
        mode: TransportMode::Metro,
        id_prefix: "metro-alt",
        builder: metro_alternatives,
        default_delay_minutes: 20,
        normal_journey_minutes: 15,
    },
    ModeProfile {
        mode: TransportMode::Train,
        id_prefix: "train-alt",
        builder: train_alternatives,
        default_delay_minutes: 30,
        normal_journey_minutes: 35,
    },
    ModeProfile {
        mode: TransportMode::Ferry,
        id_prefix: "alt",
        builder: generic_alternatives,
        default_delay_minutes: 15,
        normal_journey_minutes: 25,
    },
    ModeProfile {
        mode: TransportMode::Walk,
        id_prefix: "alt",
        builder: generic_alternatives,
        default_delay_minutes: 15,
        normal_journey_minutes: 25,
    },
    ModeProfile {
        mode: TransportMode::Other,
        id_prefix: "alt",
        builder: generic_alternatives,
        default_delay_minutes: 15,
        normal_journey_minutes: 25,
    },
];

fn profile(mode: TransportMode) -> &'static ModeProfile {
    PROFILES
        .iter()
        .find(|p| p.mode == mode)
        .unwrap_or(&PROFILES[0])
}

/// Default delay assumed for `mode` when a detection reports none.
pub fn default_delay_minutes(mode: TransportMode) -> u32 {
    profile(mode).default_delay_minutes
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Production candidate source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteCandidateGenerator;

impl RouteCandidateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build 2–3 deterministic candidates for the record's primary mode.
    pub fn generate(
        &self,
        record: &DisruptionRecord,
        directory: &dyn StopDirectory,
    ) -> Vec<RouteCandidate> {
        let profile = profile(record.primary_mode());
        let ctx = BuildContext {
            record,
            directory,
            id_prefix: profile.id_prefix,
            delay: record
                .delay_minutes
                .unwrap_or(profile.default_delay_minutes),
            normal_minutes: profile.normal_journey_minutes,
        };
        (profile.builder)(&ctx)
    }
}

impl CandidateSource for RouteCandidateGenerator {
    fn candidates(
        &self,
        record: &DisruptionRecord,
        directory: &dyn StopDirectory,
    ) -> Result<Vec<RouteCandidate>> {
        Ok(self.generate(record, directory))
    }
}

// ---------------------------------------------------------------------------
// Builder plumbing
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Timing {
    base_minutes: u32,
    /// Percentage of the reported delay the alternative still absorbs
    delay_share_pct: u32,
    transfers: u32,
    walking_m: u32,
    distance_km: f64,
    cost: f64,
    comfort: u8,
    reliability: u8,
    crowding: u8,
}

struct Draft {
    mode: &'static str,
    route_name: String,
    legs: Vec<String>,
    description: String,
    notes: Option<&'static str>,
    timing: Timing,
}

struct BuildContext<'a> {
    record: &'a DisruptionRecord,
    directory: &'a dyn StopDirectory,
    id_prefix: &'static str,
    delay: u32,
    normal_minutes: u32,
}

impl BuildContext<'_> {
    /// Nearest stop name for `mode`, or generic placeholder text.
    fn stop_name(&self, mode: TransportMode) -> String {
        self.directory
            .nearest_stop(&self.record.location, mode)
            .map(|stop| stop.name)
            .unwrap_or_else(|| format!("the nearest {} stop", mode.label().to_lowercase()))
    }

    /// First line serving the nearest `mode` stop, if known.
    fn line(&self, mode: TransportMode) -> Option<String> {
        self.directory
            .nearest_stop(&self.record.location, mode)
            .and_then(|stop| stop.lines.into_iter().next())
    }

    /// "Tram Red" when the directory knows a line, otherwise `fallback`.
    fn line_name(&self, mode: TransportMode, fallback: &str) -> String {
        match self.line(mode) {
            Some(line) => format!("{} {}", mode.label(), line),
            None => fallback.to_string(),
        }
    }

    /// What riders are avoiding, for descriptions.
    fn disrupted_service(&self) -> String {
        match self.record.affected_routes.first() {
            Some(route) => format!("route {route}"),
            None => format!(
                "{} service",
                self.record.primary_mode().label().to_lowercase()
            ),
        }
    }

    fn place(&self) -> String {
        self.record
            .location
            .area
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "the affected area".to_string())
    }

    fn single_leg(
        &self,
        mode: &'static str,
        route_name: String,
        boarding: String,
        timing: Timing,
    ) -> Draft {
        Draft {
            mode,
            legs: vec![route_name.clone()],
            description: format!(
                "Board at {boarding}. Avoids the disrupted {}.",
                self.disrupted_service()
            ),
            route_name,
            notes: None,
            timing,
        }
    }

    fn multi_leg(&self, mode: &'static str, legs: Vec<String>, timing: Timing) -> Draft {
        Draft {
            mode,
            route_name: legs.join(" → "),
            description: format!(
                "Change once to bypass the disrupted {}.",
                self.disrupted_service()
            ),
            legs,
            notes: Some("One ticket is valid across both legs while the disruption lasts."),
            timing,
        }
    }

    fn finish(&self, drafts: Vec<Draft>) -> Vec<RouteCandidate> {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                let t = draft.timing;
                let time = t
                    .base_minutes
                    .saturating_add(self.delay.saturating_mul(t.delay_share_pct) / 100);
                RouteCandidate {
                    id: format!("{}-{}", self.id_prefix, i + 1),
                    mode: draft.mode.to_string(),
                    route_name: draft.route_name,
                    legs: draft.legs,
                    estimated_time_minutes: time,
                    additional_time_minutes: time.saturating_sub(self.normal_minutes),
                    distance_km: t.distance_km,
                    cost: t.cost,
                    comfort: t.comfort,
                    reliability: t.reliability,
                    crowding: t.crowding,
                    score: 0,
                    rank: 0,
                    recommended: false,
                    walking_distance_m: t.walking_m,
                    transfer_count: t.transfers,
                    description: draft.description,
                    notes: draft.notes.map(str::to_string),
                }
            })
            .collect()
    }
}

fn walking_draft(ctx: &BuildContext<'_>, timing: Timing) -> Draft {
    Draft {
        mode: "Walk",
        route_name: format!("Walking route via {}", ctx.place()),
        legs: vec![ctx.place()],
        description: "Follow signed pedestrian diversions; step-free where available.".to_string(),
        notes: Some("Recommended only for riders able to walk the full distance."),
        timing,
    }
}

// ---------------------------------------------------------------------------
// Mode builders
// ---------------------------------------------------------------------------

fn bus_alternatives(ctx: &BuildContext<'_>) -> Vec<RouteCandidate> {
    let diverted_bus = match ctx.record.affected_routes.first() {
        Some(route) => format!("Bus {route} (diverted)"),
        None => "Connecting Bus".to_string(),
    };
    ctx.finish(vec![
        ctx.single_leg(
            "Tram",
            ctx.line_name(TransportMode::Tram, "Tram Service"),
            ctx.stop_name(TransportMode::Tram),
            Timing {
                base_minutes: 18,
                delay_share_pct: 20,
                transfers: 0,
                walking_m: 250,
                distance_km: 6.5,
                cost: 2.10,
                comfort: 7,
                reliability: 8,
                crowding: 6,
            },
        ),
        ctx.multi_leg(
            "Metro + Bus",
            vec![ctx.line_name(TransportMode::Metro, "Metro"), diverted_bus],
            Timing {
                base_minutes: 22,
                delay_share_pct: 10,
                transfers: 1,
                walking_m: 150,
                distance_km: 7.8,
                cost: 2.60,
                comfort: 6,
                reliability: 8,
                crowding: 7,
            },
        ),
        walking_draft(
            ctx,
            Timing {
                base_minutes: 30,
                delay_share_pct: 0,
                transfers: 0,
                walking_m: 1800,
                distance_km: 2.2,
                cost: 0.0,
                comfort: 4,
                reliability: 10,
                crowding: 1,
            },
        ),
    ])
}

fn tram_alternatives(ctx: &BuildContext<'_>) -> Vec<RouteCandidate> {
    ctx.finish(vec![
        ctx.single_leg(
            "Bus",
            ctx.line_name(TransportMode::Bus, "Replacement Bus Service"),
            ctx.stop_name(TransportMode::Bus),
            Timing {
                base_minutes: 20,
                delay_share_pct: 30,
                transfers: 0,
                walking_m: 100,
                distance_km: 5.0,
                cost: 2.00,
                comfort: 6,
                reliability: 6,
                crowding: 7,
            },
        ),
        ctx.single_leg(
            "Metro",
            ctx.line_name(TransportMode::Metro, "Metro Service"),
            ctx.stop_name(TransportMode::Metro),
            Timing {
                base_minutes: 16,
                delay_share_pct: 10,
                transfers: 1,
                walking_m: 400,
                distance_km: 6.0,
                cost: 2.50,
                comfort: 7,
                reliability: 9,
                crowding: 6,
            },
        ),
    ])
}

fn metro_alternatives(ctx: &BuildContext<'_>) -> Vec<RouteCandidate> {
    ctx.finish(vec![
        ctx.single_leg(
            "Bus",
            ctx.line_name(TransportMode::Bus, "Express Bus Service"),
            ctx.stop_name(TransportMode::Bus),
            Timing {
                base_minutes: 25,
                delay_share_pct: 25,
                transfers: 0,
                walking_m: 200,
                distance_km: 8.5,
                cost: 2.20,
                comfort: 6,
                reliability: 6,
                crowding: 8,
            },
        ),
        ctx.multi_leg(
            "Tram + Bus",
            vec![
                ctx.line_name(TransportMode::Tram, "Tram"),
                "Shuttle Bus".to_string(),
            ],
            Timing {
                base_minutes: 28,
                delay_share_pct: 15,
                transfers: 1,
                walking_m: 300,
                distance_km: 9.0,
                cost: 2.80,
                comfort: 6,
                reliability: 7,
                crowding: 6,
            },
        ),
        ctx.single_leg(
            "Train",
            format!("Commuter Rail from {}", ctx.stop_name(TransportMode::Train)),
            ctx.stop_name(TransportMode::Train),
            Timing {
                base_minutes: 20,
                delay_share_pct: 10,
                transfers: 1,
                walking_m: 650,
                distance_km: 11.0,
                cost: 3.40,
                comfort: 8,
                reliability: 8,
                crowding: 5,
            },
        ),
    ])
}

fn train_alternatives(ctx: &BuildContext<'_>) -> Vec<RouteCandidate> {
    ctx.finish(vec![
        ctx.single_leg(
            "Bus",
            "Rail Replacement Bus".to_string(),
            ctx.stop_name(TransportMode::Bus),
            Timing {
                base_minutes: 40,
                delay_share_pct: 20,
                transfers: 0,
                walking_m: 150,
                distance_km: 24.0,
                cost: 0.0,
                comfort: 5,
                reliability: 6,
                crowding: 8,
            },
        ),
        ctx.multi_leg(
            "Metro + Tram",
            vec![
                ctx.line_name(TransportMode::Metro, "Metro"),
                ctx.line_name(TransportMode::Tram, "Tram"),
            ],
            Timing {
                base_minutes: 35,
                delay_share_pct: 10,
                transfers: 1,
                walking_m: 350,
                distance_km: 21.0,
                cost: 3.10,
                comfort: 7,
                reliability: 8,
                crowding: 6,
            },
        ),
    ])
}

fn generic_alternatives(ctx: &BuildContext<'_>) -> Vec<RouteCandidate> {
    ctx.finish(vec![
        ctx.single_leg(
            "Bus",
            ctx.line_name(TransportMode::Bus, "Bus Service"),
            ctx.stop_name(TransportMode::Bus),
            Timing {
                base_minutes: 25,
                delay_share_pct: 20,
                transfers: 0,
                walking_m: 300,
                distance_km: 7.0,
                cost: 2.00,
                comfort: 6,
                reliability: 6,
                crowding: 6,
            },
        ),
        walking_draft(
            ctx,
            Timing {
                base_minutes: 35,
                delay_share_pct: 0,
                transfers: 0,
                walking_m: 1500,
                distance_km: 2.0,
                cost: 0.0,
                comfort: 4,
                reliability: 10,
                crowding: 1,
            },
        ),
    ])
}
