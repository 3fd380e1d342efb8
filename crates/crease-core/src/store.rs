// Record store: the parsed, read-only dataset.
//
// Built once from the raw document and never mutated afterwards. Team, phase
// and year listings are derived during the load scan.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::key::{MatchupKey, Phase};
use crate::records::{
    batting_row, bowling_row, json_kind, matchup_row, BattingRecord, BowlingRecord,
    MatchupRecord, Row,
};
use crate::teams::TeamRegistry;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed input: {message}")]
    MalformedInput { message: String },
}

impl StoreError {
    fn malformed(message: impl Into<String>) -> Self {
        StoreError::MalformedInput {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store types
// ---------------------------------------------------------------------------

/// All records filed under one composite matchup key.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupBlock {
    pub key: MatchupKey,
    pub batting: Vec<BattingRecord>,
    pub bowling: Vec<BowlingRecord>,
    pub matchups: Vec<MatchupRecord>,
}

impl MatchupBlock {
    pub fn phase(&self) -> Phase {
        self.key.phase
    }
}

/// Immutable in-memory dataset, in document order.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    blocks: Vec<MatchupBlock>,
    teams: BTreeSet<String>,
    phases: BTreeSet<Phase>,
    years: BTreeSet<i32>,
}

impl RecordStore {
    /// Build a store from an already-parsed document.
    ///
    /// Fails when the top-level `matchups` object is missing, a key does not
    /// parse, or a row is not shaped like a record. Null rows and rows
    /// without a player name are skipped.
    pub fn load(document: &Value, teams: &TeamRegistry) -> Result<Self, StoreError> {
        let root = document.as_object().ok_or_else(|| {
            StoreError::malformed(format!(
                "document root must be an object, found {}",
                json_kind(document)
            ))
        })?;

        let matchups = match root.get("matchups") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(StoreError::malformed(format!(
                    "`matchups` must be an object, found {}",
                    json_kind(other)
                )))
            }
            None => return Err(StoreError::malformed("missing top-level `matchups` field")),
        };

        let mut store = RecordStore::default();
        for (raw_key, body) in matchups {
            let key = MatchupKey::parse(raw_key, teams)
                .map_err(|e| StoreError::malformed(e.to_string()))?;
            let body = body.as_object().ok_or_else(|| {
                StoreError::malformed(format!(
                    "matchup `{raw_key}` must be an object, found {}",
                    json_kind(body)
                ))
            })?;

            let batting = collect_rows(body, raw_key, "players", batting_row)?;
            let bowling = collect_rows(body, raw_key, "data", bowling_row)?;
            let head_to_head = collect_rows(body, raw_key, "matchups", matchup_row)?;

            for bowler in &bowling {
                if bowler.span.years.is_empty() && !bowler.span.raw.is_empty() {
                    debug!(
                        "unparseable span '{}' for {} in {}",
                        bowler.span.raw, bowler.player, raw_key
                    );
                }
                store.years.extend(bowler.span.years.iter().copied());
            }
            store.teams.insert(key.team.clone());
            store.phases.insert(key.phase);
            store.blocks.push(MatchupBlock {
                key,
                batting,
                bowling,
                matchups: head_to_head,
            });
        }

        info!(
            "Loaded {} matchup blocks ({} teams, {} phases, {} seasons)",
            store.blocks.len(),
            store.teams.len(),
            store.phases.len(),
            store.years.len()
        );
        Ok(store)
    }

    /// Parse a JSON document from text and build a store.
    pub fn from_json_str(text: &str, teams: &TeamRegistry) -> Result<Self, StoreError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| StoreError::malformed(format!("invalid JSON: {e}")))?;
        Self::load(&document, teams)
    }

    /// Read and parse a JSON document from disk.
    pub fn from_path(path: &Path, teams: &TeamRegistry) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, teams)
    }

    pub fn blocks(&self) -> &[MatchupBlock] {
        &self.blocks
    }

    pub fn list_teams(&self) -> &BTreeSet<String> {
        &self.teams
    }

    pub fn list_phases(&self) -> &BTreeSet<Phase> {
        &self.phases
    }

    /// Seasons named by any bowling span. Batting rows carry no seasons.
    pub fn list_years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn collect_rows<T>(
    body: &Map<String, Value>,
    raw_key: &str,
    field: &str,
    convert: fn(&Value) -> Result<Row<T>, String>,
) -> Result<Vec<T>, StoreError> {
    let rows = match body.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(StoreError::malformed(format!(
                "`{raw_key}.{field}` must be an array, found {}",
                json_kind(other)
            )))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        match convert(row) {
            Ok(Row::Record(record)) => records.push(record),
            Ok(Row::Skipped) => {
                warn!("skipping {raw_key}.{field}[{idx}]: empty row or no player name");
            }
            Err(message) => {
                return Err(StoreError::malformed(format!(
                    "{raw_key}.{field}[{idx}]: {message}"
                )))
            }
        }
    }
    Ok(records)
}
