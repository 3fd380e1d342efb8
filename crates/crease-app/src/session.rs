// Per-user query session.
//
// Holds the current selections (team, seasons, phase, opponent) and answers
// every query against a fresh snapshot of the shared store. Nothing here
// fails: absent data comes back as empty collections or `NoData`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crease_core::config::{AnalysisConfig, Config};
use crease_core::context::{extract, extract_player, AnalysisContext};
use crease_core::filter::{filter, MatchupFilter, MatchupView, TeamMatch};
use crease_core::key::Phase;
use crease_core::records::{Advantage, MatchupRecord};
use crease_core::stats::{
    aggregate_by_phase, batting_players, best_economy, matchup_edges, per_player_totals,
    season_comparison, team_overview, top_performers, Metric, PhaseSummary, PlayerSummary,
    Qualification, QueryError, RankedBatter, RankedBowler, SeasonSlice, TeamOverview,
};
use crease_core::teams::TeamRegistry;
use crease_llm::prompt::{self, AnalysisKind, MatchPhase, MatchSituation};
use crease_llm::request::{build_request, InsightRequest};
use tracing::debug;

use crate::handle::StoreHandle;

/// Result of a player lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerLookup {
    Found(PlayerSummary),
    /// The player has no batting rows under the current selections.
    NoData { player: String },
}

/// Best options for one part of a match plan.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPrep {
    pub phase: MatchPhase,
    pub situation: MatchSituation,
    pub batters: Vec<RankedBatter>,
    pub bowlers: Vec<RankedBowler>,
}

pub struct QuerySession {
    handle: Arc<StoreHandle>,
    teams: TeamRegistry,
    team_match: TeamMatch,
    analysis: AnalysisConfig,
    team: Option<String>,
    years: Option<BTreeSet<i32>>,
    phase: Option<Phase>,
    opponent: Option<String>,
}

impl QuerySession {
    pub fn new(handle: Arc<StoreHandle>, team_match: TeamMatch, analysis: AnalysisConfig) -> Self {
        let teams = handle.teams().clone();
        Self {
            handle,
            teams,
            team_match,
            analysis,
            team: None,
            years: None,
            phase: None,
            opponent: None,
        }
    }

    pub fn from_config(handle: Arc<StoreHandle>, config: &Config) -> Self {
        Self::new(handle, config.teams.match_mode, config.analysis.clone())
    }

    // -----------------------------------------------------------------------
    // Selections
    // -----------------------------------------------------------------------

    pub fn set_team_filter(&mut self, team: impl Into<String>) {
        self.team = Some(team.into());
    }

    /// `None` or an empty set selects every season.
    pub fn set_year_filter(&mut self, years: Option<BTreeSet<i32>>) {
        self.years = years.filter(|y| !y.is_empty());
    }

    pub fn set_phase_filter(&mut self, phase: Option<Phase>) {
        self.phase = phase;
    }

    pub fn set_opponent_filter(&mut self, opponent: Option<String>) {
        self.opponent = opponent;
    }

    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    /// Display name of the selected team.
    pub fn team_name(&self) -> &str {
        match &self.team {
            Some(code) => self.teams.display_name(code),
            None => "",
        }
    }

    /// The filter the current selections describe, or `None` with no team.
    pub fn current_filter(&self) -> Option<MatchupFilter> {
        let team = self.team.clone()?;
        Some(
            MatchupFilter::team(team)
                .with_years(self.years.clone())
                .with_phase(self.phase)
                .with_opponent(self.opponent.clone())
                .with_team_match(self.team_match),
        )
    }

    /// The filtered view for the current selections.
    pub fn view(&self) -> MatchupView {
        match self.current_filter() {
            Some(f) => self.view_for(&f),
            None => MatchupView::default(),
        }
    }

    fn view_for(&self, f: &MatchupFilter) -> MatchupView {
        let snapshot = self.handle.snapshot();
        debug!("query against store version {}", snapshot.version);
        filter(&snapshot.store, f)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_aggregate_view(&self) -> Vec<PhaseSummary> {
        aggregate_by_phase(&self.view())
    }

    /// Top batters by `metric`; `n` defaults to the configured count.
    pub fn get_top_performers(&self, metric: Metric, n: Option<usize>) -> Vec<RankedBatter> {
        top_performers(
            &self.view(),
            metric,
            n.unwrap_or(self.analysis.top_n),
            &self.analysis.qualification(),
        )
    }

    pub fn get_player_summary(&self, player: &str) -> PlayerLookup {
        match per_player_totals(&self.view(), player) {
            Ok(summary) => PlayerLookup::Found(summary),
            Err(QueryError::PlayerNotFound { player }) => {
                debug!("no batting rows for {} under current selections", player);
                PlayerLookup::NoData { player }
            }
        }
    }

    pub fn overview(&self) -> TeamOverview {
        team_overview(&self.view())
    }

    pub fn players(&self) -> Vec<String> {
        batting_players(&self.view())
    }

    /// Most economical bowlers, optionally in one phase.
    pub fn economy_leaders(&self, phase: Option<Phase>) -> Vec<RankedBowler> {
        best_economy(&self.view(), phase, self.analysis.top_n)
    }

    /// Favourable (`Batsman`) or challenging (`Bowler`) head-to-heads.
    pub fn matchup_edges(&self, advantage: Advantage) -> Vec<(Phase, MatchupRecord)> {
        matchup_edges(&self.view(), advantage, self.analysis.top_n)
    }

    /// The selected team, split season by season. Ignores the year filter.
    pub fn season_comparison(&self) -> Vec<SeasonSlice> {
        let Some(f) = self.current_filter() else {
            return Vec::new();
        };
        let snapshot = self.handle.snapshot();
        season_comparison(&snapshot.store, &f.with_years(None))
    }

    /// Best batters and bowlers for one part of the innings.
    ///
    /// Chasing favours strike rate, the other situations favour runs. Every
    /// batter in the phase is ranked, regardless of balls faced.
    pub fn match_prep(&self, phase: MatchPhase, situation: MatchSituation) -> MatchPrep {
        let view = self.phase_view(phase);
        let metric = match situation {
            MatchSituation::ChasingTarget => Metric::StrikeRate,
            MatchSituation::SettingTarget | MatchSituation::PressureSituation => Metric::Runs,
        };
        let every_batter = Qualification {
            min_balls: 0,
            ..self.analysis.qualification()
        };
        MatchPrep {
            phase,
            situation,
            batters: top_performers(&view, metric, self.analysis.top_n, &every_batter),
            bowlers: best_economy(&view, None, self.analysis.top_n),
        }
    }

    fn phase_view(&self, phase: MatchPhase) -> MatchupView {
        match self.current_filter() {
            Some(f) => self.view_for(&f.with_phase(Some(phase.data_phase()))),
            None => MatchupView::default(),
        }
    }

    pub fn analysis_context(&self) -> AnalysisContext {
        extract(&self.view(), self.analysis.context_max_entries)
    }

    // -----------------------------------------------------------------------
    // Insight requests
    // -----------------------------------------------------------------------

    /// Compose the insight request for `kind` from the current selections.
    pub fn insight_request(&self, kind: &AnalysisKind) -> InsightRequest {
        let team_code = self.team.as_deref().unwrap_or_default();
        let team = self.team_name();
        let cap = self.analysis.context_max_entries;

        let (basic, detailed) = match kind {
            AnalysisKind::TeamStrategy => {
                let view = self.view();
                let basic = prompt::team_context(
                    team,
                    self.years.as_ref(),
                    &team_overview(&view),
                    &aggregate_by_phase(&view),
                );
                (basic, Some(extract(&view, cap)))
            }
            AnalysisKind::PlayerAnalysis { player } => {
                let view = self.view();
                match per_player_totals(&view, player) {
                    Ok(summary) => (
                        prompt::player_context(team, &summary),
                        Some(extract_player(&view, player, cap)),
                    ),
                    Err(_) => (format!("Player: {player}\nTeam: {team}"), None),
                }
            }
            AnalysisKind::Opposition { opponent } => {
                let view = match self.current_filter() {
                    Some(f) => self.view_for(&f.with_opponent(Some(opponent.clone()))),
                    None => MatchupView::default(),
                };
                let basic = prompt::opposition_context(
                    team,
                    self.teams.display_name(opponent),
                    view.matchups().count(),
                );
                (basic, Some(extract(&view, cap)))
            }
            AnalysisKind::MatchPreparation { phase, situation } => {
                let view = self.phase_view(*phase);
                let basic = prompt::match_prep_context(
                    team,
                    *phase,
                    *situation,
                    view.batting().count(),
                    view.bowling().count(),
                );
                (basic, Some(extract(&view, cap)))
            }
            AnalysisKind::Quick(_) => {
                (prompt::quick_context(team), Some(extract(&self.view(), cap)))
            }
            AnalysisKind::StrengthsWeaknesses
            | AnalysisKind::RoleOptimization
            | AnalysisKind::TacticalRecommendations
            | AnalysisKind::PerformanceTrends
            | AnalysisKind::Custom { .. } => {
                let view = self.view();
                (
                    prompt::view_summary_context(team, &view),
                    Some(extract(&view, cap)),
                )
            }
        };

        build_request(
            &basic,
            detailed.as_ref(),
            &kind.instruction(&self.teams, team_code),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_core::store::RecordStore;
    use serde_json::json;

    fn handle() -> Arc<StoreHandle> {
        let doc = json!({
            "matchups": {
                "DC_vs_GG_PP": {
                    "players": [
                        { "player": "A", "runs": 50, "bf": 30, "sr": 166.7, "wks": 1, "matches": 3 },
                        { "player": "B", "runs": 10, "bf": 20, "sr": 50.0, "wks": 2, "matches": 2 }
                    ],
                    "data": [
                        { "Player": "R", "RR": 6.5, "Span": "2025" },
                        { "Player": "N", "RR": 8.0, "Span": "2023-2024" }
                    ],
                    "matchups": [ { "batsman": "A", "bowler": "R", "advantage": "batsman" } ]
                },
                "DC_vs_SW_Post_PP": {
                    "players": [ { "player": "A", "runs": 80, "bf": 60, "sr": 133.3, "wks": 2, "matches": 3 } ],
                    "data": [ { "Player": "R", "RR": 7.0, "Span": "2024-2025" } ]
                }
            }
        });
        let store = RecordStore::load(&doc, &TeamRegistry::default()).unwrap();
        Arc::new(StoreHandle::from_store(store, TeamRegistry::default()))
    }

    fn session() -> QuerySession {
        let mut s = QuerySession::new(handle(), TeamMatch::Prefix, AnalysisConfig::default());
        s.set_team_filter("DC");
        s
    }

    fn years(ys: &[i32]) -> Option<BTreeSet<i32>> {
        Some(ys.iter().copied().collect())
    }

    #[test]
    fn no_team_selected_gives_empty_results() {
        let s = QuerySession::new(handle(), TeamMatch::Prefix, AnalysisConfig::default());
        assert!(s.view().is_empty());
        assert!(s.get_aggregate_view().is_empty());
        assert!(s.season_comparison().is_empty());
        assert_eq!(s.overview(), TeamOverview::default());
    }

    #[test]
    fn phase_filter_narrows_the_aggregate() {
        let mut s = session();
        assert_eq!(s.get_aggregate_view().len(), 2);

        s.set_phase_filter(Some(Phase::Powerplay));
        let summaries = s.get_aggregate_view();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_runs, 60);
        assert_eq!(summaries[0].player_count, 2);
    }

    #[test]
    fn year_filter_only_changes_bowling() {
        let mut s = session();
        s.set_year_filter(years(&[2024]));
        let view = s.view();
        let bowlers: Vec<&str> = view.bowling().map(|(_, b)| b.player.as_str()).collect();
        assert_eq!(bowlers, vec!["N", "R"]);
        assert_eq!(view.batting().count(), 3);

        s.set_year_filter(Some(BTreeSet::new()));
        assert_eq!(s.view().bowling().count(), 3);
    }

    #[test]
    fn player_lookup_is_total() {
        let s = session();
        match s.get_player_summary("A") {
            PlayerLookup::Found(summary) => assert_eq!(summary.total_runs, 130),
            other => panic!("expected a summary, got {other:?}"),
        }
        assert_eq!(
            s.get_player_summary("Z"),
            PlayerLookup::NoData {
                player: "Z".to_string()
            }
        );
    }

    #[test]
    fn opponent_filter_selects_one_fixture() {
        let mut s = session();
        s.set_opponent_filter(Some("SW".into()));
        assert_eq!(s.view().blocks().len(), 1);
        assert_eq!(s.players(), vec!["A"]);
    }

    #[test]
    fn match_prep_ranks_within_the_phase() {
        let s = session();
        let chase = s.match_prep(MatchPhase::Powerplay, MatchSituation::ChasingTarget);
        let names: Vec<&str> = chase.batters.iter().map(|b| b.player.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(chase.bowlers[0].player, "R");

        let death = s.match_prep(MatchPhase::DeathOvers, MatchSituation::SettingTarget);
        assert_eq!(death.batters.len(), 1);
        assert_eq!(death.batters[0].runs, 80);
    }

    #[test]
    fn season_comparison_ignores_the_year_filter() {
        let mut s = session();
        s.set_year_filter(years(&[2025]));
        let slices = s.season_comparison();
        let years: Vec<i32> = slices.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2023, 2024, 2025]);
    }

    #[test]
    fn team_request_carries_context_and_instruction() {
        let s = session();
        let req = s.insight_request(&AnalysisKind::TeamStrategy);
        assert!(req.context.contains("Team: Desert Capitals"));
        assert!(req.context.contains("Year Filter: All Years"));
        assert!(req.context.contains("\"name\": \"B\""));
        assert!(req
            .instruction
            .starts_with("Provide a comprehensive strategic analysis for Desert Capitals"));
    }

    #[test]
    fn opposition_request_uses_display_names() {
        let s = session();
        let req = s.insight_request(&AnalysisKind::Opposition {
            opponent: "GG".into(),
        });
        assert!(req.context.contains("Opposition: Gulf Giants"));
        assert!(req.context.contains("Total Matchups Analyzed: 1"));
        assert!(req.instruction.contains("when facing Gulf Giants"));
    }

    #[test]
    fn player_request_without_data_has_no_detail() {
        let s = session();
        let req = s.insight_request(&AnalysisKind::PlayerAnalysis {
            player: "Nobody".into(),
        });
        assert!(req.context.contains("No detailed stats provided"));

        let req = s.insight_request(&AnalysisKind::PlayerAnalysis { player: "A".into() });
        assert!(req.context.contains("Total Runs: 130"));
        assert!(!req.context.contains("\"name\": \"B\""));
    }

    #[test]
    fn queries_follow_a_reload() {
        let h = handle();
        let mut s = QuerySession::new(Arc::clone(&h), TeamMatch::Prefix, AnalysisConfig::default());
        s.set_team_filter("DC");
        assert_eq!(s.players(), vec!["A", "B"]);

        let doc = json!({ "matchups": { "DC_PP": { "players": [ { "player": "C" } ] } } });
        h.replace(RecordStore::load(&doc, &TeamRegistry::default()).unwrap());
        assert_eq!(s.players(), vec!["C"]);
    }
}
