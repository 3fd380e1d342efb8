// Prompt templates for cricket insight requests.
//
// The system preamble fixes the analyst persona, the metric glossary and the
// answering rules. Per-request text is split into a short basic context
// (rendered here from pre-computed aggregates) and an instruction chosen by
// the analysis kind. The model is told to use the numbers it is given rather
// than recompute them.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crease_core::filter::MatchupView;
use crease_core::key::Phase;
use crease_core::stats::{PhaseSummary, PlayerSummary, TeamOverview};
use crease_core::teams::TeamRegistry;

// ---------------------------------------------------------------------------
// System preamble
// ---------------------------------------------------------------------------

/// Return the static system preamble shared by every insight request.
pub fn system_preamble() -> String {
    "You are a professional cricket analyst with deep knowledge of T20 cricket strategy and player performance metrics.\n\
     \n\
     ## CRICKET METRICS EXPLANATION\n\
     - SR (Strike Rate): Runs per 100 balls faced (higher is more aggressive)\n\
     - RR (Run Rate): Runs per over (economy rate for bowlers)\n\
     - BF: Balls Faced by batsman\n\
     - Wks: Wickets taken (for bowlers) or times dismissed (for batsmen)\n\
     - Ave: Batting/Bowling average\n\
     - PP: Powerplay (overs 1-6)\n\
     - Post PP: Middle and death overs (7-20)\n\
     - Dot%: Percentage of dot balls (no runs scored)\n\
     - Bnd%: Boundary percentage (4s and 6s)\n\
     \n\
     ## CRITICAL INSTRUCTIONS\n\
     1. Base your analysis ONLY on the actual statistics provided\n\
     2. Reference specific numbers, strike rates, averages, and performance metrics\n\
     3. Identify patterns in the data (e.g., powerplay vs death over performance)\n\
     4. Compare players using the actual statistics provided\n\
     5. Provide tactical recommendations based on the data trends\n\
     6. Highlight specific matchup advantages/disadvantages from the data\n\
     7. Use cricket terminology appropriately (strike rates, economy rates, etc.)\n\
     \n\
     Please provide:\n\
     1. Data-driven insights with specific statistics\n\
     2. Actionable tactical recommendations\n\
     3. Player-specific performance analysis\n\
     4. Strategic advantages based on the numbers\n\
     5. Risk assessment using actual performance data\n\
     \n\
     Format your response professionally for team management decisions."
        .to_string()
}

// ---------------------------------------------------------------------------
// Match preparation inputs
// ---------------------------------------------------------------------------

/// The part of an innings a match plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Powerplay,
    MiddleOvers,
    DeathOvers,
}

impl MatchPhase {
    pub const ALL: [MatchPhase; 3] = [
        MatchPhase::Powerplay,
        MatchPhase::MiddleOvers,
        MatchPhase::DeathOvers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MatchPhase::Powerplay => "Powerplay",
            MatchPhase::MiddleOvers => "Middle Overs",
            MatchPhase::DeathOvers => "Death Overs",
        }
    }

    /// The recorded phase bucket covering these overs.
    pub fn data_phase(&self) -> Phase {
        match self {
            MatchPhase::Powerplay => Phase::Powerplay,
            MatchPhase::MiddleOvers | MatchPhase::DeathOvers => Phase::PostPowerplay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSituation {
    ChasingTarget,
    SettingTarget,
    PressureSituation,
}

impl MatchSituation {
    pub const ALL: [MatchSituation; 3] = [
        MatchSituation::ChasingTarget,
        MatchSituation::SettingTarget,
        MatchSituation::PressureSituation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MatchSituation::ChasingTarget => "Chasing Target",
            MatchSituation::SettingTarget => "Setting Target",
            MatchSituation::PressureSituation => "Pressure Situation",
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis kinds and instructions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickInsight {
    Strengths,
    Improvements,
    NextMatchTips,
}

/// What a request asks the model to do. Teams are codes, players raw names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    TeamStrategy,
    PlayerAnalysis { player: String },
    Opposition { opponent: String },
    MatchPreparation {
        phase: MatchPhase,
        situation: MatchSituation,
    },
    StrengthsWeaknesses,
    RoleOptimization,
    TacticalRecommendations,
    PerformanceTrends,
    Custom { query: String },
    Quick(QuickInsight),
}

impl AnalysisKind {
    /// Short heading for displaying the result.
    pub fn title(&self) -> String {
        match self {
            AnalysisKind::TeamStrategy => "Team Strategy Overview".to_string(),
            AnalysisKind::PlayerAnalysis { player } => format!("Player Analysis: {player}"),
            AnalysisKind::Opposition { .. } => "Opposition Strategy".to_string(),
            AnalysisKind::MatchPreparation { phase, situation } => {
                format!("Match Strategy: {} - {}", phase.label(), situation.label())
            }
            AnalysisKind::StrengthsWeaknesses => "Team Strengths & Weaknesses".to_string(),
            AnalysisKind::RoleOptimization => "Player Role Optimization".to_string(),
            AnalysisKind::TacticalRecommendations => "Tactical Recommendations".to_string(),
            AnalysisKind::PerformanceTrends => "Performance Trends".to_string(),
            AnalysisKind::Custom { .. } => "Custom Query".to_string(),
            AnalysisKind::Quick(QuickInsight::Strengths) => "Team Strengths".to_string(),
            AnalysisKind::Quick(QuickInsight::Improvements) => "Areas to Improve".to_string(),
            AnalysisKind::Quick(QuickInsight::NextMatchTips) => "Next Match Tips".to_string(),
        }
    }

    /// The instruction sentence for team code `team`, using display names.
    pub fn instruction(&self, teams: &TeamRegistry, team: &str) -> String {
        let team = teams.display_name(team);
        match self {
            AnalysisKind::TeamStrategy => format!(
                "Provide a comprehensive strategic analysis for {team} including strengths, \
                 weaknesses, and tactical recommendations for team management."
            ),
            AnalysisKind::PlayerAnalysis { player } => format!(
                "Provide detailed performance analysis and recommendations for {player}, \
                 including role optimization, strengths, areas for improvement, and tactical \
                 usage suggestions."
            ),
            AnalysisKind::Opposition { opponent } => format!(
                "Provide tactical recommendations for {team} when facing {}, including \
                 bowling strategies, field placements, and batting order suggestions.",
                teams.display_name(opponent)
            ),
            AnalysisKind::MatchPreparation { phase, situation } => format!(
                "Create a comprehensive match preparation strategy for {team} for {} in a {} \
                 scenario. Include batting order, bowling plans, and tactical recommendations.",
                phase.label(),
                situation.label()
            ),
            AnalysisKind::Custom { query } if !query.trim().is_empty() => query.trim().to_string(),
            AnalysisKind::Quick(QuickInsight::Strengths) => {
                format!("Identify the top 3 strengths of {team} based on performance data.")
            }
            AnalysisKind::Quick(QuickInsight::Improvements) => {
                format!("Identify the top 3 areas where {team} needs improvement.")
            }
            AnalysisKind::Quick(QuickInsight::NextMatchTips) => {
                format!("Provide 3 key tactical tips for {team}'s next match.")
            }
            // Generic kinds, and a blank custom query.
            other => format!(
                "Provide {} for {team} based on the available performance data.",
                other.title().to_lowercase()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Basic context renderers
// ---------------------------------------------------------------------------

/// `All Years` or the sorted years joined with commas.
fn years_label(years: Option<&BTreeSet<i32>>) -> String {
    match years {
        Some(years) if !years.is_empty() => years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        _ => "All Years".to_string(),
    }
}

fn format_phase_summaries(phases: &[PhaseSummary]) -> String {
    if phases.is_empty() {
        return "none".to_string();
    }
    phases
        .iter()
        .map(|p| {
            format!(
                "{}: SR {:.1}, {} runs, {} wickets, {} players",
                p.phase.code(),
                p.avg_strike_rate,
                p.total_runs,
                p.total_wickets,
                p.player_count
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Team overview context.
pub fn team_context(
    team: &str,
    years: Option<&BTreeSet<i32>>,
    overview: &TeamOverview,
    phases: &[PhaseSummary],
) -> String {
    let mut out = String::with_capacity(256);
    let _ = writeln!(out, "Team: {team}");
    let _ = writeln!(out, "Year Filter: {}", years_label(years));
    let _ = writeln!(out, "Total Players: {}", overview.squad_size);
    let _ = writeln!(out, "Total Runs: {}", overview.total_runs);
    let _ = writeln!(out, "Total Wickets: {}", overview.total_wickets);
    let _ = write!(out, "Phase Performance: {}", format_phase_summaries(phases));
    out
}

/// Single player context.
pub fn player_context(team: &str, summary: &PlayerSummary) -> String {
    let phases = summary
        .phases
        .iter()
        .map(|line| {
            format!(
                "{}: {} runs off {} balls, SR {:.1}, {} matches",
                line.phase.code(),
                line.runs,
                line.balls_faced,
                line.mean_strike_rate,
                line.matches
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    let mut out = String::with_capacity(256);
    let _ = writeln!(out, "Player: {}", summary.player);
    let _ = writeln!(out, "Team: {team}");
    let _ = writeln!(out, "Total Runs: {}", summary.total_runs);
    let _ = writeln!(out, "Total Balls: {}", summary.total_balls_faced);
    let _ = writeln!(out, "Average Strike Rate: {:.1}", summary.mean_strike_rate);
    let _ = writeln!(out, "Times Dismissed: {}", summary.total_dismissals);
    let _ = write!(out, "Phase Performance: {phases}");
    out
}

pub fn opposition_context(team: &str, opponent: &str, matchups_analyzed: usize) -> String {
    format!(
        "Your Team: {team}\n\
         Opposition: {opponent}\n\
         Total Matchups Analyzed: {matchups_analyzed}"
    )
}

pub fn match_prep_context(
    team: &str,
    phase: MatchPhase,
    situation: MatchSituation,
    players_available: usize,
    bowlers_available: usize,
) -> String {
    format!(
        "Team: {team}\n\
         Match Phase: {}\n\
         Match Situation: {}\n\
         Players Available: {players_available}\n\
         Bowlers Available: {bowlers_available}",
        phase.label(),
        situation.label()
    )
}

/// Shape of a view, for the generic analysis kinds.
pub fn view_summary_context(team: &str, view: &MatchupView) -> String {
    let phases = view
        .phases()
        .iter()
        .map(|p| p.code())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Team: {team}\n\
         Total Matchups: {}\n\
         Phases: {phases}\n\
         Player Count: {}\n\
         Bowler Count: {}\n\
         Matchup Count: {}",
        view.blocks().len(),
        view.batting().count(),
        view.bowling().count(),
        view.matchups().count()
    )
}

pub fn quick_context(team: &str) -> String {
    format!("Team: {team}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_core::stats::PlayerPhaseLine;

    fn instruction(kind: AnalysisKind, team: &str) -> String {
        kind.instruction(&TeamRegistry::default(), team)
    }

    #[test]
    fn preamble_carries_glossary_and_rules() {
        let preamble = system_preamble();
        assert!(preamble.starts_with("You are a professional cricket analyst"));
        assert!(preamble.contains("- PP: Powerplay (overs 1-6)"));
        assert!(preamble.contains("- Post PP: Middle and death overs (7-20)"));
        assert!(preamble.contains("7. Use cricket terminology appropriately"));
        assert!(preamble.contains("5. Risk assessment using actual performance data"));
    }

    #[test]
    fn team_and_opposition_instructions() {
        assert_eq!(
            instruction(AnalysisKind::TeamStrategy, "DC"),
            "Provide a comprehensive strategic analysis for Desert Capitals including strengths, \
             weaknesses, and tactical recommendations for team management."
        );
        let opp = AnalysisKind::Opposition {
            opponent: "GG".into(),
        };
        assert!(instruction(opp, "DC").starts_with("Provide tactical recommendations for Desert Capitals when facing Gulf Giants,"));
    }

    #[test]
    fn match_preparation_instruction_names_phase_and_situation() {
        let kind = AnalysisKind::MatchPreparation {
            phase: MatchPhase::DeathOvers,
            situation: MatchSituation::ChasingTarget,
        };
        let text = kind.instruction(&TeamRegistry::default(), "MIE");
        assert!(text.contains("for MI Emirates for Death Overs in a Chasing Target scenario."));
        assert_eq!(kind.title(), "Match Strategy: Death Overs - Chasing Target");
    }

    #[test]
    fn generic_kinds_use_lowercased_title() {
        assert_eq!(
            instruction(AnalysisKind::StrengthsWeaknesses, "SW"),
            "Provide team strengths & weaknesses for Sharjah Warriors based on the available performance data."
        );
        assert_eq!(
            instruction(AnalysisKind::PerformanceTrends, "DV"),
            "Provide performance trends for Dubai Vipers based on the available performance data."
        );
    }

    #[test]
    fn custom_query_is_used_verbatim_unless_blank() {
        let kind = AnalysisKind::Custom {
            query: " How should we bowl at the death? ".into(),
        };
        assert_eq!(instruction(kind, "X"), "How should we bowl at the death?");

        let blank = AnalysisKind::Custom { query: "  ".into() };
        assert_eq!(
            instruction(blank, "X"),
            "Provide custom query for X based on the available performance data."
        );
    }

    #[test]
    fn quick_insight_instructions() {
        assert_eq!(
            instruction(AnalysisKind::Quick(QuickInsight::NextMatchTips), "GG"),
            "Provide 3 key tactical tips for Gulf Giants's next match."
        );
        assert!(instruction(AnalysisKind::Quick(QuickInsight::Strengths), "GG")
            .contains("top 3 strengths of Gulf Giants"));
    }

    #[test]
    fn match_phase_maps_to_recorded_phase() {
        assert_eq!(MatchPhase::Powerplay.data_phase(), Phase::Powerplay);
        assert_eq!(MatchPhase::MiddleOvers.data_phase(), Phase::PostPowerplay);
        assert_eq!(MatchPhase::DeathOvers.data_phase(), Phase::PostPowerplay);
    }

    #[test]
    fn team_context_lines() {
        let overview = TeamOverview {
            squad_size: 2,
            total_runs: 60,
            total_wickets: 3,
            total_matches: 5,
        };
        let phases = vec![PhaseSummary {
            phase: Phase::Powerplay,
            avg_strike_rate: 112.5,
            total_runs: 60,
            total_wickets: 3,
            player_count: 2,
        }];
        let years: BTreeSet<i32> = [2025, 2024].into_iter().collect();

        let text = team_context("Desert Capitals", Some(&years), &overview, &phases);
        assert_eq!(
            text,
            "Team: Desert Capitals\n\
             Year Filter: 2024, 2025\n\
             Total Players: 2\n\
             Total Runs: 60\n\
             Total Wickets: 3\n\
             Phase Performance: PP: SR 112.5, 60 runs, 3 wickets, 2 players"
        );

        let all_years = team_context("Desert Capitals", None, &TeamOverview::default(), &[]);
        assert!(all_years.contains("Year Filter: All Years"));
        assert!(all_years.ends_with("Phase Performance: none"));
    }

    #[test]
    fn player_context_lines() {
        let summary = PlayerSummary {
            player: "A".into(),
            total_runs: 170,
            total_balls_faced: 110,
            mean_strike_rate: 158.35,
            total_dismissals: 5,
            phases: vec![PlayerPhaseLine {
                phase: Phase::PostPowerplay,
                runs: 120,
                balls_faced: 80,
                mean_strike_rate: 150.0,
                matches: 6,
            }],
        };
        let text = player_context("Desert Capitals", &summary);
        assert!(text.starts_with("Player: A\nTeam: Desert Capitals\n"));
        assert!(text.contains("Times Dismissed: 5"));
        assert!(text.ends_with("Post_PP: 120 runs off 80 balls, SR 150.0, 6 matches"));
    }

    #[test]
    fn opposition_and_prep_contexts() {
        assert_eq!(
            opposition_context("Desert Capitals", "Gulf Giants", 4),
            "Your Team: Desert Capitals\nOpposition: Gulf Giants\nTotal Matchups Analyzed: 4"
        );
        let prep = match_prep_context(
            "Desert Capitals",
            MatchPhase::Powerplay,
            MatchSituation::SettingTarget,
            3,
            2,
        );
        assert!(prep.contains("Match Phase: Powerplay\nMatch Situation: Setting Target"));
        assert!(prep.ends_with("Bowlers Available: 2"));
        assert_eq!(quick_context("Gulf Giants"), "Team: Gulf Giants");
    }

    #[test]
    fn view_summary_of_empty_view() {
        let text = view_summary_context("Dubai Vipers", &MatchupView::default());
        assert!(text.contains("Total Matchups: 0\nPhases: \n"));
    }
}
