// Analysis context: a flattened, size-bounded copy of a view for the
// insight generator.
//
// Entries are relabelled and tagged with their phase, nothing is computed.
// When the combined entry count exceeds the cap, batting, bowling and
// head-to-head entries are taken in turn, each kind in view order, so every
// kind keeps its earliest rows.

use serde::Serialize;
use tracing::debug;

use crate::filter::MatchupView;
use crate::key::Phase;
use crate::records::{Advantage, BattingRecord};

pub const DEFAULT_MAX_CONTEXT_ENTRIES: usize = 500;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BattingEntry {
    pub name: String,
    pub phase: Phase,
    pub runs: u32,
    pub balls_faced: u32,
    pub strike_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    pub wickets_lost: u32,
    pub matches: u32,
    pub innings: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BowlingEntry {
    pub name: String,
    pub phase: Phase,
    pub bowl_type: String,
    pub runs_conceded: u32,
    pub balls_bowled: u32,
    pub wickets: u32,
    pub run_rate: f64,
    pub strike_rate: f64,
    pub dot_percentage: f64,
    pub boundary_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_speed_kph: Option<f64>,
    pub span: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchupEntry {
    pub batsman: String,
    pub bowler: String,
    pub phase: Phase,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
    pub wickets: u32,
    pub advantage: Advantage,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AnalysisContext {
    pub batting: Vec<BattingEntry>,
    pub bowling: Vec<BowlingEntry>,
    pub matchups: Vec<MatchupEntry>,
    /// Entries dropped to respect the cap.
    pub omitted: usize,
}

impl AnalysisContext {
    pub fn len(&self) -> usize {
        self.batting.len() + self.bowling.len() + self.matchups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }
}

/// Flatten every row of the view, capped at `max_entries`.
pub fn extract(view: &MatchupView, max_entries: usize) -> AnalysisContext {
    let batting = view.batting().map(|(phase, r)| batting_entry(phase, r)).collect();
    let bowling = view
        .bowling()
        .map(|(phase, r)| BowlingEntry {
            name: r.player.clone(),
            phase,
            bowl_type: r.bowl_type.clone(),
            runs_conceded: r.runs_conceded,
            balls_bowled: r.balls_bowled,
            wickets: r.wickets,
            run_rate: r.run_rate,
            strike_rate: r.strike_rate,
            dot_percentage: r.dot_pct,
            boundary_percentage: r.boundary_pct,
            average_speed_kph: r.avg_speed_kph,
            span: r.span.raw.clone(),
        })
        .collect();
    let matchups = view
        .matchups()
        .map(|(phase, m)| MatchupEntry {
            batsman: m.batsman.clone(),
            bowler: m.bowler.clone(),
            phase,
            runs: m.runs,
            balls: m.balls,
            strike_rate: m.strike_rate,
            wickets: m.wickets,
            advantage: m.advantage,
        })
        .collect();

    bound(batting, bowling, matchups, max_entries)
}

/// Batting rows of one player only, capped at `max_entries`.
pub fn extract_player(view: &MatchupView, player: &str, max_entries: usize) -> AnalysisContext {
    let batting = view
        .batting()
        .filter(|(_, r)| r.player == player)
        .map(|(phase, r)| batting_entry(phase, r))
        .collect();
    bound(batting, Vec::new(), Vec::new(), max_entries)
}

fn batting_entry(phase: Phase, r: &BattingRecord) -> BattingEntry {
    BattingEntry {
        name: r.player.clone(),
        phase,
        runs: r.runs,
        balls_faced: r.balls_faced,
        strike_rate: r.strike_rate,
        average: r.average,
        wickets_lost: r.wickets_lost,
        matches: r.matches,
        innings: r.innings,
        technique: r.technique.clone(),
    }
}

fn bound(
    batting: Vec<BattingEntry>,
    bowling: Vec<BowlingEntry>,
    matchups: Vec<MatchupEntry>,
    max_entries: usize,
) -> AnalysisContext {
    let total = batting.len() + bowling.len() + matchups.len();
    if total <= max_entries {
        return AnalysisContext {
            batting,
            bowling,
            matchups,
            omitted: 0,
        };
    }

    // Round-robin quotas over the three kinds.
    let mut quota = [0usize; 3];
    let available = [batting.len(), bowling.len(), matchups.len()];
    let mut remaining = max_entries;
    while remaining > 0 {
        let mut progressed = false;
        for (kind, taken) in quota.iter_mut().enumerate() {
            if remaining > 0 && *taken < available[kind] {
                *taken += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let context = AnalysisContext {
        batting: batting.into_iter().take(quota[0]).collect(),
        bowling: bowling.into_iter().take(quota[1]).collect(),
        matchups: matchups.into_iter().take(quota[2]).collect(),
        omitted: total - max_entries,
    };
    debug!(
        "analysis context capped at {} entries ({} omitted)",
        max_entries, context.omitted
    );
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_team;
    use crate::store::RecordStore;
    use crate::teams::TeamRegistry;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn store() -> RecordStore {
        let doc = json!({
            "matchups": {
                "GG_vs_DC_PP": {
                    "players": [
                        { "player": "B1", "runs": 10 }, { "player": "B2", "runs": 20 },
                        { "player": "B3", "runs": 30 }, { "player": "B4", "runs": 40 }
                    ],
                    "data": [ { "Player": "W1", "Span": "2025" } ],
                    "matchups": [
                        { "batsman": "B1", "bowler": "X1" }, { "batsman": "B2", "bowler": "X2" },
                        { "batsman": "B3", "bowler": "X3" }
                    ]
                },
                "GG_vs_DC_Post_PP": {
                    "players": [ { "player": "B1", "runs": 5, "avg": null } ]
                }
            }
        });
        RecordStore::load(&doc, &TeamRegistry::default()).unwrap()
    }

    #[test]
    fn extract_flattens_every_row_with_phase_tags() {
        let ctx = extract(&filter_team(&store(), "GG", None), DEFAULT_MAX_CONTEXT_ENTRIES);
        assert_eq!(ctx.batting.len(), 5);
        assert_eq!(ctx.bowling.len(), 1);
        assert_eq!(ctx.matchups.len(), 3);
        assert!(!ctx.is_truncated());
        assert_eq!(ctx.batting[4].phase, Phase::PostPowerplay);
        assert_eq!(ctx.bowling[0].span, "2025");
    }

    #[test]
    fn extract_never_invents_names_or_phases() {
        let view = filter_team(&store(), "GG", None);
        let ctx = extract(&view, DEFAULT_MAX_CONTEXT_ENTRIES);

        let mut source_names: BTreeSet<String> = view.batting().map(|(_, r)| r.player.clone()).collect();
        source_names.extend(view.bowling().map(|(_, r)| r.player.clone()));
        source_names.extend(view.matchups().flat_map(|(_, m)| [m.batsman.clone(), m.bowler.clone()]));

        let mut ctx_names: BTreeSet<String> = ctx.batting.iter().map(|e| e.name.clone()).collect();
        ctx_names.extend(ctx.bowling.iter().map(|e| e.name.clone()));
        ctx_names.extend(ctx.matchups.iter().flat_map(|m| [m.batsman.clone(), m.bowler.clone()]));
        assert!(ctx_names.is_subset(&source_names));

        let phases: BTreeSet<Phase> = ctx.batting.iter().map(|e| e.phase).collect();
        assert!(phases.is_subset(&view.phases()));
    }

    #[test]
    fn cap_takes_kinds_in_turn() {
        let ctx = extract(&filter_team(&store(), "GG", None), 5);
        assert_eq!(ctx.len(), 5);
        assert_eq!(ctx.omitted, 4);
        // batting, bowling, matchups, batting, (bowling exhausted) matchups
        assert_eq!(ctx.batting.len(), 2);
        assert_eq!(ctx.bowling.len(), 1);
        assert_eq!(ctx.matchups.len(), 2);
        assert_eq!(ctx.batting[0].name, "B1");
        assert_eq!(ctx.batting[1].name, "B2");
    }

    #[test]
    fn cap_is_deterministic() {
        let view = filter_team(&store(), "GG", None);
        assert_eq!(extract(&view, 3), extract(&view, 3));
    }

    #[test]
    fn zero_cap_yields_empty_context() {
        let ctx = extract(&filter_team(&store(), "GG", None), 0);
        assert!(ctx.is_empty());
        assert_eq!(ctx.omitted, 9);
    }

    #[test]
    fn player_context_keeps_only_that_batter() {
        let ctx = extract_player(&filter_team(&store(), "GG", None), "B1", 100);
        assert_eq!(ctx.batting.len(), 2);
        assert!(ctx.bowling.is_empty());
        assert!(ctx.matchups.is_empty());
        assert!(ctx.batting.iter().all(|e| e.name == "B1"));
    }

    #[test]
    fn null_average_is_not_serialized() {
        let ctx = extract_player(&filter_team(&store(), "GG", None), "B1", 100);
        let text = serde_json::to_string(&ctx.batting[1]).unwrap();
        assert!(!text.contains("average"));
        assert!(text.contains("\"phase\":\"Post_PP\""));
    }
}
