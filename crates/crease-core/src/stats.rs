// Phase summaries, rankings and per-player totals over a filtered view.
//
// Every aggregate over zero rows is expressed as an empty sequence or zero
// totals. Means over zero rows are never emitted.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::filter::{filter, MatchupFilter, MatchupView};
use crate::key::Phase;
use crate::records::{Advantage, BattingRecord, MatchupRecord};
use crate::store::RecordStore;

pub const DEFAULT_MIN_QUALIFYING_BALLS: u32 = 50;
pub const DEFAULT_MIN_CONSISTENCY_MATCHES: u32 = 3;
/// Balls faced that qualify a row for average rankings when it records
/// neither matches nor innings.
pub const CONSISTENCY_FALLBACK_BALLS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("no data for player `{player}` in the current view")]
    PlayerNotFound { player: String },
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Phase summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    /// Arithmetic mean of the batting strike rates in this phase.
    pub avg_strike_rate: f64,
    pub total_runs: u64,
    /// Dismissals suffered by the batters in this phase.
    pub total_wickets: u64,
    pub player_count: usize,
}

/// One summary per phase that has at least one batting row, in phase order.
pub fn aggregate_by_phase(view: &MatchupView) -> Vec<PhaseSummary> {
    Phase::ALL
        .iter()
        .filter_map(|&phase| {
            let rows: Vec<_> = view
                .batting()
                .filter(|(p, _)| *p == phase)
                .map(|(_, r)| r)
                .collect();
            let avg_strike_rate = mean(rows.iter().map(|r| r.strike_rate))?;
            Some(PhaseSummary {
                phase,
                avg_strike_rate,
                total_runs: rows.iter().map(|r| u64::from(r.runs)).sum(),
                total_wickets: rows.iter().map(|r| u64::from(r.wickets_lost)).sum(),
                player_count: rows.len(),
            })
        })
        .collect()
}

/// Headline figures across every batting row in the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamOverview {
    /// Batting rows, counted once per phase block they appear in.
    pub squad_size: usize,
    pub total_runs: u64,
    pub total_wickets: u64,
    pub total_matches: u64,
}

pub fn team_overview(view: &MatchupView) -> TeamOverview {
    view.batting()
        .fold(TeamOverview::default(), |mut acc, (_, r)| {
            acc.squad_size += 1;
            acc.total_runs += u64::from(r.runs);
            acc.total_wickets += u64::from(r.wickets_lost);
            acc.total_matches += u64::from(r.matches);
            acc
        })
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Batting metric to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    Runs,
    StrikeRate,
    /// Batting average; rows without an average never qualify.
    Average,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Runs => "runs",
            Metric::StrikeRate => "strike rate",
            Metric::Average => "average",
        }
    }
}

/// Thresholds a batting row must meet before it is ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qualification {
    /// Minimum balls faced for strike-rate rankings.
    pub min_balls: u32,
    /// Minimum matches (or innings, when matches are absent) for average
    /// rankings.
    pub min_matches: u32,
}

impl Qualification {
    /// Whether a row has enough appearances to rank by average: matches
    /// when recorded, else innings, else [`CONSISTENCY_FALLBACK_BALLS`].
    pub fn is_consistent(&self, record: &BattingRecord) -> bool {
        if record.matches_recorded {
            record.matches >= self.min_matches
        } else if record.innings_recorded {
            record.innings >= self.min_matches
        } else {
            record.balls_faced >= CONSISTENCY_FALLBACK_BALLS
        }
    }
}

impl Default for Qualification {
    fn default() -> Self {
        Self {
            min_balls: DEFAULT_MIN_QUALIFYING_BALLS,
            min_matches: DEFAULT_MIN_CONSISTENCY_MATCHES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBatter {
    pub player: String,
    pub phase: Phase,
    pub value: f64,
    pub runs: u32,
    pub balls_faced: u32,
    pub strike_rate: f64,
}

/// Top `n` batting rows by descending `metric`.
///
/// Ties keep view order. Count metrics are ranked unfiltered; rate metrics
/// apply `qualification` first.
pub fn top_performers(
    view: &MatchupView,
    metric: Metric,
    n: usize,
    qualification: &Qualification,
) -> Vec<RankedBatter> {
    let mut ranked: Vec<RankedBatter> = view
        .batting()
        .filter_map(|(phase, r)| {
            let value = match metric {
                Metric::Runs => f64::from(r.runs),
                Metric::StrikeRate => {
                    if r.balls_faced < qualification.min_balls {
                        return None;
                    }
                    r.strike_rate
                }
                Metric::Average => {
                    if !qualification.is_consistent(r) {
                        return None;
                    }
                    r.average.filter(|avg| *avg > 0.0)?
                }
            };
            Some(RankedBatter {
                player: r.player.clone(),
                phase,
                value,
                runs: r.runs,
                balls_faced: r.balls_faced,
                strike_rate: r.strike_rate,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBowler {
    pub player: String,
    pub phase: Phase,
    pub bowl_type: String,
    pub run_rate: f64,
    pub wickets: u32,
}

/// The `n` most economical bowling rows (lowest run rate first), optionally
/// restricted to one phase. Ties keep view order.
pub fn best_economy(view: &MatchupView, phase: Option<Phase>, n: usize) -> Vec<RankedBowler> {
    let mut ranked: Vec<RankedBowler> = view
        .bowling()
        .filter(|(p, _)| phase.map_or(true, |want| *p == want))
        .map(|(phase, r)| RankedBowler {
            player: r.player.clone(),
            phase,
            bowl_type: r.bowl_type.clone(),
            run_rate: r.run_rate,
            wickets: r.wickets,
        })
        .collect();

    ranked.sort_by(|a, b| a.run_rate.partial_cmp(&b.run_rate).unwrap_or(Ordering::Equal));
    ranked.truncate(n);
    ranked
}

/// The first `n` head-to-head rows labelled with `advantage`, in view order.
pub fn matchup_edges(
    view: &MatchupView,
    advantage: Advantage,
    n: usize,
) -> Vec<(Phase, MatchupRecord)> {
    view.matchups()
        .filter(|(_, m)| m.advantage == advantage)
        .take(n)
        .map(|(phase, m)| (phase, m.clone()))
        .collect()
}

/// Distinct batter names in the view, sorted.
pub fn batting_players(view: &MatchupView) -> Vec<String> {
    view.batting()
        .map(|(_, r)| r.player.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Per-player totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPhaseLine {
    pub phase: Phase,
    pub runs: u64,
    pub balls_faced: u64,
    pub mean_strike_rate: f64,
    pub matches: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player: String,
    pub total_runs: u64,
    pub total_balls_faced: u64,
    pub mean_strike_rate: f64,
    pub total_dismissals: u64,
    pub phases: Vec<PlayerPhaseLine>,
}

/// Sum a player's batting rows across every phase of the view.
pub fn per_player_totals(view: &MatchupView, player: &str) -> Result<PlayerSummary, QueryError> {
    let rows: Vec<_> = view.batting().filter(|(_, r)| r.player == player).collect();
    let Some(mean_strike_rate) = mean(rows.iter().map(|(_, r)| r.strike_rate)) else {
        return Err(QueryError::PlayerNotFound {
            player: player.to_string(),
        });
    };

    let phases = Phase::ALL
        .iter()
        .filter_map(|&phase| {
            let in_phase: Vec<_> = rows.iter().filter(|(p, _)| *p == phase).collect();
            let mean_strike_rate = mean(in_phase.iter().map(|(_, r)| r.strike_rate))?;
            Some(PlayerPhaseLine {
                phase,
                runs: in_phase.iter().map(|(_, r)| u64::from(r.runs)).sum(),
                balls_faced: in_phase.iter().map(|(_, r)| u64::from(r.balls_faced)).sum(),
                mean_strike_rate,
                matches: in_phase.iter().map(|(_, r)| u64::from(r.matches)).sum(),
            })
        })
        .collect();

    Ok(PlayerSummary {
        player: player.to_string(),
        total_runs: rows.iter().map(|(_, r)| u64::from(r.runs)).sum(),
        total_balls_faced: rows.iter().map(|(_, r)| u64::from(r.balls_faced)).sum(),
        mean_strike_rate,
        total_dismissals: rows.iter().map(|(_, r)| u64::from(r.wickets_lost)).sum(),
        phases,
    })
}

// ---------------------------------------------------------------------------
// Season comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonSlice {
    pub year: i32,
    pub bowling_rows: usize,
    pub wickets_taken: u64,
    pub runs_conceded: u64,
    /// Batting rows carry no seasons, so these match every slice.
    pub batting_rows: usize,
    pub batting_runs: u64,
}

/// Re-run `base` once per season in the store, restricted to that season.
pub fn season_comparison(store: &RecordStore, base: &MatchupFilter) -> Vec<SeasonSlice> {
    store
        .list_years()
        .iter()
        .map(|&year| {
            let view = filter(store, &base.clone().with_years(Some([year].into())));
            let overview = team_overview(&view);
            SeasonSlice {
                year,
                bowling_rows: view.bowling().count(),
                wickets_taken: view.bowling().map(|(_, b)| u64::from(b.wickets)).sum(),
                runs_conceded: view.bowling().map(|(_, b)| u64::from(b.runs_conceded)).sum(),
                batting_rows: overview.squad_size,
                batting_runs: overview.total_runs,
            }
        })
        .collect()
}
