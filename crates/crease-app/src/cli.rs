// Command-line surface of the `crease` binary and the plain-text report it
// prints.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use crease_core::key::Phase;
use crease_core::records::{Advantage, MatchupRecord};
use crease_core::stats::Metric;
use crease_llm::prompt::{AnalysisKind, MatchPhase, MatchSituation, QuickInsight};

use crate::session::{PlayerLookup, QuerySession};

#[derive(Debug, Parser)]
#[command(name = "crease")]
#[command(about = "Franchise cricket matchup analytics with AI insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Team code, e.g. DC or MIE
    pub team: String,

    /// Restrict bowling records to these seasons (repeatable)
    #[arg(short, long = "year")]
    pub years: Vec<i32>,

    /// First season of an inclusive range (combines with --year)
    #[arg(long = "from")]
    pub from_year: Option<i32>,

    /// Last season of an inclusive range (combines with --year)
    #[arg(long = "to")]
    pub to_year: Option<i32>,

    /// Restrict to one innings phase
    #[arg(short, long, value_enum)]
    pub phase: Option<PhaseArg>,

    /// Restrict to fixtures against this team code
    #[arg(long = "vs")]
    pub opponent: Option<String>,

    /// Show a per-player breakdown
    #[arg(long)]
    pub player: Option<String>,

    /// Ranking metric for top batters
    #[arg(short, long, value_enum, default_value = "runs")]
    pub metric: MetricArg,

    /// Number of ranked rows to show (defaults to the configured top_n)
    #[arg(short = 'n', long)]
    pub top: Option<usize>,

    /// Override the data file from the configuration
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Stream an AI insight after the report
    #[arg(short, long, value_enum)]
    pub insight: Option<InsightArg>,

    /// Match phase for `--insight match-prep`
    #[arg(long, value_enum, default_value = "powerplay")]
    pub match_phase: MatchPhaseArg,

    /// Match situation for `--insight match-prep`
    #[arg(long, value_enum, default_value = "chasing-target")]
    pub situation: SituationArg,

    /// Question for `--insight custom`
    #[arg(short, long)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Pp,
    PostPp,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Pp => Phase::Powerplay,
            PhaseArg::PostPp => Phase::PostPowerplay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Runs,
    StrikeRate,
    Average,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Runs => Metric::Runs,
            MetricArg::StrikeRate => Metric::StrikeRate,
            MetricArg::Average => Metric::Average,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsightArg {
    TeamStrategy,
    Player,
    Opposition,
    MatchPrep,
    StrengthsWeaknesses,
    RoleOptimization,
    Tactical,
    Trends,
    Custom,
    Strengths,
    Improvements,
    NextMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchPhaseArg {
    Powerplay,
    MiddleOvers,
    DeathOvers,
}

impl From<MatchPhaseArg> for MatchPhase {
    fn from(arg: MatchPhaseArg) -> Self {
        match arg {
            MatchPhaseArg::Powerplay => MatchPhase::Powerplay,
            MatchPhaseArg::MiddleOvers => MatchPhase::MiddleOvers,
            MatchPhaseArg::DeathOvers => MatchPhase::DeathOvers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SituationArg {
    ChasingTarget,
    SettingTarget,
    PressureSituation,
}

impl From<SituationArg> for MatchSituation {
    fn from(arg: SituationArg) -> Self {
        match arg {
            SituationArg::ChasingTarget => MatchSituation::ChasingTarget,
            SituationArg::SettingTarget => MatchSituation::SettingTarget,
            SituationArg::PressureSituation => MatchSituation::PressureSituation,
        }
    }
}

impl Cli {
    /// Seasons named by `--year` plus the `--from`/`--to` range.
    ///
    /// A lone endpoint selects that one season and reversed endpoints are
    /// swapped. Empty means every season.
    pub fn year_set(&self) -> BTreeSet<i32> {
        let mut years: BTreeSet<i32> = self.years.iter().copied().collect();
        let range = match (self.from_year, self.to_year) {
            (Some(from), Some(to)) => Some((from.min(to), from.max(to))),
            (Some(year), None) | (None, Some(year)) => Some((year, year)),
            (None, None) => None,
        };
        if let Some((first, last)) = range {
            years.extend(first..=last);
        }
        years
    }

    /// Push the filter flags into `session`.
    pub fn apply_filters(&self, session: &mut QuerySession) {
        session.set_team_filter(self.team.clone());
        session.set_year_filter(Some(self.year_set()));
        session.set_phase_filter(self.phase.map(Phase::from));
        session.set_opponent_filter(self.opponent.clone());
    }

    /// The insight the flags ask for, if any.
    pub fn analysis_kind(&self) -> anyhow::Result<Option<AnalysisKind>> {
        let Some(insight) = self.insight else {
            return Ok(None);
        };
        let kind = match insight {
            InsightArg::TeamStrategy => AnalysisKind::TeamStrategy,
            InsightArg::Player => match &self.player {
                Some(player) => AnalysisKind::PlayerAnalysis {
                    player: player.clone(),
                },
                None => bail!("--insight player needs --player NAME"),
            },
            InsightArg::Opposition => match &self.opponent {
                Some(opponent) => AnalysisKind::Opposition {
                    opponent: opponent.clone(),
                },
                None => bail!("--insight opposition needs --vs TEAM"),
            },
            InsightArg::MatchPrep => AnalysisKind::MatchPreparation {
                phase: self.match_phase.into(),
                situation: self.situation.into(),
            },
            InsightArg::StrengthsWeaknesses => AnalysisKind::StrengthsWeaknesses,
            InsightArg::RoleOptimization => AnalysisKind::RoleOptimization,
            InsightArg::Tactical => AnalysisKind::TacticalRecommendations,
            InsightArg::Trends => AnalysisKind::PerformanceTrends,
            InsightArg::Custom => AnalysisKind::Custom {
                query: self.query.clone().unwrap_or_default(),
            },
            InsightArg::Strengths => AnalysisKind::Quick(QuickInsight::Strengths),
            InsightArg::Improvements => AnalysisKind::Quick(QuickInsight::Improvements),
            InsightArg::NextMatch => AnalysisKind::Quick(QuickInsight::NextMatchTips),
        };
        Ok(Some(kind))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

fn selection_line(cli: &Cli) -> String {
    let years = cli.year_set();
    let years = if years.is_empty() {
        "All Years".to_string()
    } else {
        years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let phase = cli
        .phase
        .map(|p| Phase::from(p).code())
        .unwrap_or("all phases");
    let opponent = cli.opponent.as_deref().unwrap_or("all opponents");
    format!("Seasons: {years} | Phase: {phase} | Opponent: {opponent}")
}

fn matchup_line(out: &mut String, phase: Phase, m: &MatchupRecord) {
    let _ = writeln!(
        out,
        "  {} vs {} ({}): {} off {} balls, SR {:.1}, {} wickets",
        m.batsman,
        m.bowler,
        phase.code(),
        m.runs,
        m.balls,
        m.strike_rate,
        m.wickets
    );
}

/// Render the statistics report for the session's current selections.
pub fn render_report(session: &QuerySession, cli: &Cli) -> String {
    let mut out = String::with_capacity(2048);
    let _ = writeln!(out, "== {} ({}) ==", session.team_name(), cli.team);
    let _ = writeln!(out, "{}", selection_line(cli));

    if session.view().is_empty() {
        let _ = writeln!(out, "No matchup data for this selection.");
        return out;
    }

    let overview = session.overview();
    let _ = writeln!(
        out,
        "Squad: {} batting rows, {} runs, {} wickets lost, {} matches",
        overview.squad_size, overview.total_runs, overview.total_wickets, overview.total_matches
    );

    let _ = writeln!(out, "\nPhase summary:");
    for p in session.get_aggregate_view() {
        let _ = writeln!(
            out,
            "  {:<8} SR {:.1}, {} runs, {} wickets, {} players",
            p.phase.code(),
            p.avg_strike_rate,
            p.total_runs,
            p.total_wickets,
            p.player_count
        );
    }

    let metric = Metric::from(cli.metric);
    let _ = writeln!(out, "\nTop batters by {}:", metric.label());
    let top = session.get_top_performers(metric, cli.top);
    if top.is_empty() {
        let _ = writeln!(out, "  none qualify");
    }
    for (i, b) in top.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({}): {} runs off {} balls, SR {:.1}",
            i + 1,
            b.player,
            b.phase.code(),
            b.runs,
            b.balls_faced,
            b.strike_rate
        );
    }

    let _ = writeln!(out, "\nMost economical bowlers:");
    for (i, b) in session.economy_leaders(None).iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({}, {}): RR {:.2}, {} wickets",
            i + 1,
            b.player,
            b.phase.code(),
            b.bowl_type,
            b.run_rate,
            b.wickets
        );
    }

    let favourable = session.matchup_edges(Advantage::Batsman);
    if !favourable.is_empty() {
        let _ = writeln!(out, "\nFavourable matchups:");
        for (phase, m) in &favourable {
            matchup_line(&mut out, *phase, m);
        }
    }
    let challenging = session.matchup_edges(Advantage::Bowler);
    if !challenging.is_empty() {
        let _ = writeln!(out, "\nChallenging matchups:");
        for (phase, m) in &challenging {
            matchup_line(&mut out, *phase, m);
        }
    }

    let seasons = session.season_comparison();
    if !seasons.is_empty() {
        let _ = writeln!(out, "\nSeason comparison (bowling):");
        for s in &seasons {
            let _ = writeln!(
                out,
                "  {}: {} bowlers, {} wickets, {} runs conceded",
                s.year, s.bowling_rows, s.wickets_taken, s.runs_conceded
            );
        }
    }

    if let Some(player) = &cli.player {
        let _ = writeln!(out);
        match session.get_player_summary(player) {
            PlayerLookup::Found(summary) => {
                let _ = writeln!(
                    out,
                    "Player {}: {} runs off {} balls, mean SR {:.1}, dismissed {} times",
                    summary.player,
                    summary.total_runs,
                    summary.total_balls_faced,
                    summary.mean_strike_rate,
                    summary.total_dismissals
                );
                for line in &summary.phases {
                    let _ = writeln!(
                        out,
                        "  {:<8} {} runs off {} balls, SR {:.1}, {} matches",
                        line.phase.code(),
                        line.runs,
                        line.balls_faced,
                        line.mean_strike_rate,
                        line.matches
                    );
                }
            }
            PlayerLookup::NoData { player } => {
                let _ = writeln!(out, "No batting data for {player} in this selection.");
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["crease"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn filter_flags_parse() {
        let cli = parse(&["DC", "-y", "2024", "--year", "2025", "--phase", "post-pp", "--vs", "GG"]);
        assert_eq!(cli.team, "DC");
        assert_eq!(cli.years, vec![2024, 2025]);
        assert_eq!(cli.phase, Some(PhaseArg::PostPp));
        assert_eq!(cli.opponent.as_deref(), Some("GG"));
        assert_eq!(cli.metric, MetricArg::Runs);
        assert_eq!(
            selection_line(&cli),
            "Seasons: 2024, 2025 | Phase: Post_PP | Opponent: GG"
        );
    }

    #[test]
    fn year_range_expands_and_merges_with_single_years() {
        let cli = parse(&["DC", "--from", "2023", "--to", "2025"]);
        assert_eq!(cli.year_set(), BTreeSet::from([2023, 2024, 2025]));
        assert_eq!(
            selection_line(&cli),
            "Seasons: 2023, 2024, 2025 | Phase: all phases | Opponent: all opponents"
        );

        let cli = parse(&["DC", "--from", "2025", "--to", "2024", "-y", "2021"]);
        assert_eq!(cli.year_set(), BTreeSet::from([2021, 2024, 2025]));

        let cli = parse(&["DC", "--to", "2022"]);
        assert_eq!(cli.year_set(), BTreeSet::from([2022]));

        assert!(parse(&["DC"]).year_set().is_empty());
    }

    #[test]
    fn team_is_required() {
        assert!(Cli::try_parse_from(["crease"]).is_err());
    }

    #[test]
    fn no_insight_flag_means_no_kind() {
        assert_eq!(parse(&["DC"]).analysis_kind().unwrap(), None);
    }

    #[test]
    fn match_prep_kind_uses_phase_and_situation() {
        let cli = parse(&[
            "MIE",
            "--insight",
            "match-prep",
            "--match-phase",
            "death-overs",
            "--situation",
            "pressure-situation",
        ]);
        assert_eq!(
            cli.analysis_kind().unwrap(),
            Some(AnalysisKind::MatchPreparation {
                phase: MatchPhase::DeathOvers,
                situation: MatchSituation::PressureSituation,
            })
        );
    }

    #[test]
    fn player_and_opposition_kinds_need_their_flags() {
        assert!(parse(&["DC", "--insight", "player"]).analysis_kind().is_err());
        assert!(parse(&["DC", "--insight", "opposition"]).analysis_kind().is_err());
        assert_eq!(
            parse(&["DC", "--insight", "opposition", "--vs", "SW"])
                .analysis_kind()
                .unwrap(),
            Some(AnalysisKind::Opposition {
                opponent: "SW".into()
            })
        );
    }

    #[test]
    fn quick_kinds_map_directly() {
        assert_eq!(
            parse(&["DC", "-i", "next-match"]).analysis_kind().unwrap(),
            Some(AnalysisKind::Quick(QuickInsight::NextMatchTips))
        );
    }
}
