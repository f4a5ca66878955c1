//! Turns scored candidates into a [`CompiledSolution`].
//!
//! Compilation runs a fixed sequence: rank, pick the primary and the bounded
//! secondary list, then derive the summary, step-by-step instructions,
//! impact estimate and affected user groups. It is pure apart from the
//! `calculated_at` timestamp, and never fails: an empty candidate list
//! yields a solution with no primary.

use chrono::Utc;

use crate::config::CompilerConfig;
use crate::domain::{CompiledSolution, DisruptionRecord, RouteCandidate, Severity};
use crate::scorer::RouteScorer;

/// Tag recorded in [`CompiledSolution::calculation_method`].
pub const CALCULATION_METHOD: &str = "weighted-multi-factor";

const GENERAL_PUBLIC: &str = "General Public";

/// Area keyword → user groups. Matched case-insensitively; every matching
/// row contributes, in table order.
const AREA_GROUPS: &[(&[&str], &[&str])] = &[
    (
        &["center", "central"],
        &["City Center Travelers", "Office Workers", "Shoppers"],
    ),
    (&["airport"], &["Air Travelers", "Airport Staff"]),
    (&["station"], &["Rail Commuters", "Through Passengers"]),
];

fn severity_multiplier(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 2.5,
        Severity::High => 1.8,
        Severity::Medium => 1.2,
        Severity::Low => 1.0,
    }
}

fn transfers_clause(count: u32) -> String {
    match count {
        0 => String::new(),
        1 => " (1 transfer)".to_string(),
        n => format!(" ({n} transfers)"),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolutionCompiler {
    config: CompilerConfig,
    scorer: RouteScorer,
}

impl SolutionCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            scorer: RouteScorer,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile scored candidates for `record`.
    pub fn compile(
        &self,
        record: &DisruptionRecord,
        candidates: &[RouteCandidate],
    ) -> CompiledSolution {
        let ranked = self.scorer.rank(candidates);
        let primary = ranked.first().cloned();

        let secondary = match &primary {
            Some(p) => ranked
                .iter()
                .filter(|c| c.id != p.id)
                .take(self.config.secondary_limit)
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let (action_summary, instructions) = match &primary {
            Some(p) => (Self::action_summary(p), self.instructions(p)),
            None => (
                "No alternatives available. Follow operator announcements for updates."
                    .to_string(),
                vec!["Step 1: Check operator announcements before travelling".to_string()],
            ),
        };

        CompiledSolution {
            disruption_id: record.id.clone(),
            disruption_type: record.disruption_type,
            severity: record.severity,
            area: record.location.area.clone(),
            estimated_impact: self.estimated_impact(record, primary.as_ref()),
            affected_user_groups: affected_user_groups(record),
            options_evaluated: ranked.len(),
            ranked_candidates: ranked,
            primary,
            secondary,
            action_summary,
            instructions,
            calculated_at: Utc::now(),
            calculation_method: CALCULATION_METHOD.to_string(),
            ready_for_notification: true,
        }
    }

    /// One-line recommendation for the primary candidate.
    pub fn action_summary(primary: &RouteCandidate) -> String {
        format!(
            "{} instead. Route: {}. Estimated time: {} minutes{}",
            primary.mode,
            primary.route_name,
            primary.estimated_time_minutes,
            transfers_clause(primary.transfer_count)
        )
    }

    /// Ordered rider instructions for one candidate.
    ///
    /// Multi-leg names yield one `Step` line per leg plus a transfer note;
    /// single-leg names yield a boarding step and a travel step. A walking
    /// line precedes the closing total-time line when walking exceeds 100 m.
    pub fn instructions(&self, candidate: &RouteCandidate) -> Vec<String> {
        let mut lines = Vec::new();

        if candidate.is_multi_leg() {
            for (i, leg) in candidate.name_legs().into_iter().enumerate() {
                lines.push(format!("Step {}: Take {}", i + 1, leg));
            }
            match candidate.transfer_count {
                0 => {}
                1 => lines.push("Note: this route includes 1 transfer".to_string()),
                n => lines.push(format!("Note: this route includes {n} transfers")),
            }
        } else {
            lines.push(format!(
                "Step 1: Board {} service: {}",
                candidate.mode, candidate.route_name
            ));
            if !candidate.description.trim().is_empty() {
                lines.push(format!("Details: {}", candidate.description));
            }
            lines.push("Step 2: Travel to your destination".to_string());
        }

        if candidate.walking_distance_m > 100 {
            let speed = self.config.walking_speed_m_per_min.max(1);
            let minutes = candidate.walking_distance_m / speed;
            lines.push(format!(
                "Walking: about {} minutes ({} m)",
                minutes, candidate.walking_distance_m
            ));
        }

        lines.push(format!(
            "Total estimated journey time: {} minutes",
            candidate.estimated_time_minutes
        ));
        lines
    }

    /// Rider-count range plus a journey-time comparison.
    pub fn estimated_impact(
        &self,
        record: &DisruptionRecord,
        primary: Option<&RouteCandidate>,
    ) -> String {
        let routes = record.affected_routes.len().max(1) as f64;
        let estimate = (f64::from(self.config.baseline_travelers)
            * routes
            * severity_multiplier(record.severity))
        .round() as u64;
        let low = estimate.saturating_sub(100);
        let high = estimate + 100;
        let mut text = format!("Approximately {low}-{high} travelers affected.");

        if let Some(primary) = primary {
            let expected = record.delay_minutes.unwrap_or(0).saturating_sub(5).max(10);
            if primary.estimated_time_minutes > expected {
                text.push_str(&format!(
                    " Alternative adds about {} extra minutes.",
                    primary.estimated_time_minutes - expected
                ));
            } else {
                text.push_str(" Alternative offers a similar journey time.");
            }
        }
        text
    }
}

/// Rider groups to target, always ending with the general public.
pub fn affected_user_groups(record: &DisruptionRecord) -> Vec<String> {
    let mut groups = Vec::new();

    if !record.affected_routes.is_empty() {
        groups.push(format!(
            "Commuters on routes: {}",
            record.affected_routes.join(", ")
        ));
    }

    if let Some(area) = record.location.area.as_deref() {
        let area = area.to_lowercase();
        for (keywords, names) in AREA_GROUPS {
            if keywords.iter().any(|k| area.contains(k)) {
                groups.extend(names.iter().map(|n| n.to_string()));
            }
        }
    }

    groups.push(GENERAL_PUBLIC.to_string());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DetectionEvent, DisruptionId, DisruptionType};

    fn record(area: Option<&str>, routes: &[&str], delay: Option<i64>) -> DisruptionRecord {
        let mut event = DetectionEvent::new(DisruptionType::Delay, Severity::Medium);
        event.affected_area = area.map(str::to_string);
        event.affected_routes = routes.iter().map(|r| r.to_string()).collect();
        event.delay_minutes = delay;
        event.into_record(DisruptionId::from("d-1"), Utc::now())
    }

    fn scored(id: &str, mode: &str, name: &str, score: u8) -> RouteCandidate {
        let mut c = RouteCandidate::new(id, mode, name).with_time(25);
        c.score = score;
        c
    }

    #[test]
    fn empty_candidates_compile_without_primary() {
        let solution = SolutionCompiler::default().compile(&record(None, &[], None), &[]);
        assert!(solution.primary.is_none());
        assert!(solution.secondary.is_empty());
        assert!(solution.action_summary.starts_with("No alternatives available"));
        assert!(solution.ready_for_notification);
        assert_eq!(solution.options_evaluated, 0);
        assert!(!solution.has_alternatives());
    }

    #[test]
    fn secondary_is_bounded_and_excludes_primary() {
        let cands = vec![
            scored("a", "Bus", "Bus 1", 40),
            scored("b", "Tram", "Tram 2", 90),
            scored("c", "Metro", "Metro 3", 70),
            scored("d", "Walk", "Walk", 60),
        ];
        let solution =
            SolutionCompiler::default().compile(&record(None, &["46A"], Some(20)), &cands);
        assert_eq!(solution.primary.as_ref().unwrap().id, "b");
        let secondary: Vec<&str> = solution.secondary.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(secondary, vec!["c", "d"]);
        assert_eq!(solution.options_evaluated, 4);
        assert_eq!(solution.calculation_method, CALCULATION_METHOD);
    }

    #[test]
    fn action_summary_pluralises_transfers() {
        let none = RouteCandidate::new("a", "Tram", "Tram Service").with_time(20);
        assert_eq!(
            SolutionCompiler::action_summary(&none),
            "Tram instead. Route: Tram Service. Estimated time: 20 minutes"
        );
        let one = none.clone().with_transfers(1);
        assert!(SolutionCompiler::action_summary(&one).ends_with(" (1 transfer)"));
        let two = none.with_transfers(2);
        assert!(SolutionCompiler::action_summary(&two).ends_with(" (2 transfers)"));
    }

    #[test]
    fn single_leg_instructions() {
        let c = RouteCandidate::new("a", "Bus", "Bus 46A (diverted)")
            .with_time(25)
            .with_walking(400)
            .with_description("Diverted via Dame Street");
        let lines = SolutionCompiler::default().instructions(&c);
        assert_eq!(
            lines,
            vec![
                "Step 1: Board Bus service: Bus 46A (diverted)".to_string(),
                "Details: Diverted via Dame Street".to_string(),
                "Step 2: Travel to your destination".to_string(),
                "Walking: about 5 minutes (400 m)".to_string(),
                "Total estimated journey time: 25 minutes".to_string(),
            ]
        );
    }

    #[test]
    fn short_walks_get_no_walking_line() {
        let c = RouteCandidate::new("a", "Bus", "Bus 27").with_walking(100);
        let lines = SolutionCompiler::default().instructions(&c);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| !l.starts_with("Walking")));
    }

    #[test]
    fn impact_scales_with_routes_and_severity() {
        let compiler = SolutionCompiler::default();
        let mut rec = record(None, &["1", "2"], Some(40));
        rec.severity = Severity::Critical;
        let primary = RouteCandidate::new("a", "Bus", "Bus").with_time(45);
        let text = compiler.estimated_impact(&rec, Some(&primary));
        assert_eq!(
            text,
            "Approximately 900-1100 travelers affected. Alternative adds about 10 extra minutes."
        );

        let quick = RouteCandidate::new("b", "Tram", "Tram").with_time(10);
        let mut low = record(None, &[], None);
        low.severity = Severity::Low;
        assert_eq!(
            compiler.estimated_impact(&low, Some(&quick)),
            "Approximately 100-300 travelers affected. Alternative offers a similar journey time."
        );
    }

    #[test]
    fn user_groups_from_routes_and_area() {
        let groups = affected_user_groups(&record(Some("City Centre"), &["46A", "15"], None));
        assert_eq!(groups, vec!["Commuters on routes: 46A, 15", "General Public"]);

        let groups = affected_user_groups(&record(Some("Central Plaza"), &["46A", "15"], None));
        assert_eq!(
            groups,
            vec![
                "Commuters on routes: 46A, 15",
                "City Center Travelers",
                "Office Workers",
                "Shoppers",
                "General Public",
            ]
        );

        let airport = affected_user_groups(&record(Some("Airport Station"), &[], None));
        assert_eq!(
            airport,
            vec![
                "Air Travelers",
                "Airport Staff",
                "Rail Commuters",
                "Through Passengers",
                "General Public",
            ]
        );

        assert_eq!(affected_user_groups(&record(None, &[], None)), vec!["General Public"]);
    }
}
