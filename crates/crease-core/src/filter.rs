// Query filter: selects matchup blocks by team, phase, opponent and season.
//
// Season filtering only touches bowling rows. Batting and head-to-head rows
// carry no season information and pass through unchanged.

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::debug;

use crate::key::Phase;
use crate::records::{BattingRecord, BowlingRecord, MatchupRecord};
use crate::span::span_mentions_any;
use crate::store::{MatchupBlock, RecordStore};

/// How a team code is compared against matchup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamMatch {
    /// The raw key starts with the code. `MI` also selects `MIE_...` keys.
    #[default]
    Prefix,
    /// The parsed team code equals the code.
    Exact,
}

/// Filter parameters for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchupFilter {
    pub team: String,
    pub years: Option<BTreeSet<i32>>,
    pub phase: Option<Phase>,
    pub opponent: Option<String>,
    pub team_match: TeamMatch,
}

impl MatchupFilter {
    /// A filter selecting every block of `team`, all seasons and phases.
    pub fn team(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            years: None,
            phase: None,
            opponent: None,
            team_match: TeamMatch::default(),
        }
    }

    pub fn with_years(mut self, years: Option<BTreeSet<i32>>) -> Self {
        self.years = years;
        self
    }

    pub fn with_phase(mut self, phase: Option<Phase>) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_opponent(mut self, opponent: Option<String>) -> Self {
        self.opponent = opponent;
        self
    }

    pub fn with_team_match(mut self, team_match: TeamMatch) -> Self {
        self.team_match = team_match;
        self
    }

    fn selects(&self, block: &MatchupBlock) -> bool {
        let team_ok = match self.team_match {
            TeamMatch::Prefix => block.key.raw.starts_with(&self.team),
            TeamMatch::Exact => block.key.team == self.team,
        };
        let phase_ok = self.phase.map_or(true, |p| block.key.phase == p);
        let opponent_ok = self
            .opponent
            .as_deref()
            .map_or(true, |code| block.key.names_opponent(code));
        team_ok && phase_ok && opponent_ok
    }
}

/// An independent, filtered copy of part of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupView {
    blocks: Vec<MatchupBlock>,
}

impl MatchupView {
    pub fn new(blocks: Vec<MatchupBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[MatchupBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Batting rows tagged with their phase, in view order.
    pub fn batting(&self) -> impl Iterator<Item = (Phase, &BattingRecord)> {
        self.blocks
            .iter()
            .flat_map(|b| b.batting.iter().map(move |r| (b.key.phase, r)))
    }

    /// Bowling rows tagged with their phase, in view order.
    pub fn bowling(&self) -> impl Iterator<Item = (Phase, &BowlingRecord)> {
        self.blocks
            .iter()
            .flat_map(|b| b.bowling.iter().map(move |r| (b.key.phase, r)))
    }

    /// Head-to-head rows tagged with their phase, in view order.
    pub fn matchups(&self) -> impl Iterator<Item = (Phase, &MatchupRecord)> {
        self.blocks
            .iter()
            .flat_map(|b| b.matchups.iter().map(move |r| (b.key.phase, r)))
    }

    /// Distinct phases present in the view.
    pub fn phases(&self) -> BTreeSet<Phase> {
        self.blocks.iter().map(|b| b.key.phase).collect()
    }
}

/// Apply `filter` to the store, producing a new view.
pub fn filter(store: &RecordStore, filter: &MatchupFilter) -> MatchupView {
    let blocks: Vec<MatchupBlock> = store
        .blocks()
        .iter()
        .filter(|block| filter.selects(block))
        .map(|block| {
            let mut block = block.clone();
            if let Some(years) = &filter.years {
                block
                    .bowling
                    .retain(|bowler| span_mentions_any(&bowler.span.raw, years));
            }
            block
        })
        .collect();

    debug!(
        "filter team={} phase={:?} opponent={:?} years={:?} selected {} blocks",
        filter.team,
        filter.phase,
        filter.opponent,
        filter.years,
        blocks.len()
    );
    MatchupView { blocks }
}

/// Team and season filter with default prefix matching.
pub fn filter_team(store: &RecordStore, team: &str, years: Option<&BTreeSet<i32>>) -> MatchupView {
    filter(
        store,
        &MatchupFilter::team(team).with_years(years.cloned()),
    )
}
