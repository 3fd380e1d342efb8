// Typed batting, bowling and batter-vs-bowler records.
//
// Source rows are loosely typed: numbers may arrive as integers, floats,
// numeric strings or null, and column names differ between row kinds. The
// private `Raw*` structs absorb that variance; the public records carry
// explicit types with defined defaults.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::span::parse_span;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One batter's figures within a single matchup block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattingRecord {
    pub player: String,
    pub runs: u32,
    pub balls_faced: u32,
    /// Pre-computed by the source; never recomputed.
    pub strike_rate: f64,
    /// `None` when the player has not been dismissed.
    pub average: Option<f64>,
    pub wickets_lost: u32,
    pub matches: u32,
    pub innings: u32,
    pub technique: Option<String>,
    /// Whether the source row carried a usable `matches` count.
    #[serde(skip)]
    pub matches_recorded: bool,
    #[serde(skip)]
    pub innings_recorded: bool,
}

/// Season span of a bowling row: the raw text plus the years it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSpan {
    pub raw: String,
    pub years: BTreeSet<i32>,
}

impl YearSpan {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            years: parse_span(raw),
        }
    }
}

/// One bowler's figures within a single matchup block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowlingRecord {
    pub player: String,
    pub bowl_type: String,
    pub runs_conceded: u32,
    pub balls_bowled: u32,
    pub wickets: u32,
    pub run_rate: f64,
    pub strike_rate: f64,
    pub dot_pct: f64,
    pub boundary_pct: f64,
    pub avg_speed_kph: Option<f64>,
    pub span: YearSpan,
}

/// Which side a batter-vs-bowler matchup favours, as labelled by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Advantage {
    Batsman,
    Bowler,
    Neutral,
}

impl Advantage {
    /// Unrecognised or missing labels are neutral.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("batsman") | Some("batter") => Advantage::Batsman,
            Some("bowler") => Advantage::Bowler,
            _ => Advantage::Neutral,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Advantage::Batsman => "batsman",
            Advantage::Bowler => "bowler",
            Advantage::Neutral => "neutral",
        }
    }
}

/// Head-to-head figures for one batter against one bowler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupRecord {
    pub batsman: String,
    pub bowler: String,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
    pub wickets: u32,
    pub advantage: Advantage,
}

// ---------------------------------------------------------------------------
// Raw serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBatting {
    #[serde(default)]
    player: Option<String>,
    #[serde(default, rename = "Player")]
    player_capitalised: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    runs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    bf: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    avg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    wks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    matches: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    innings: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    technique: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawBowling {
    #[serde(default)]
    Player: Option<String>,
    #[serde(default, rename = "player")]
    player_lowercase: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    BowlType: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    Runs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    BF: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    Wks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    RR: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    SR: Option<f64>,
    #[serde(default, rename = "Dot%", deserialize_with = "lenient_number")]
    dot_pct: Option<f64>,
    #[serde(default, rename = "Bnd%", deserialize_with = "lenient_number")]
    boundary_pct: Option<f64>,
    #[serde(default, rename = "Ave kph", deserialize_with = "lenient_number")]
    avg_kph: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    Span: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMatchup {
    #[serde(default, deserialize_with = "lenient_text")]
    batsman: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    bowler: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    runs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    bf: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    wks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    advantage: Option<String>,
}

// ---------------------------------------------------------------------------
// Lenient field helpers
// ---------------------------------------------------------------------------

/// Accept numbers, numeric strings and null. Anything else (including
/// placeholders such as "-") becomes `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|v| v.is_finite()))
}

/// Accept strings and numbers (a span may be written as a bare 2025, a
/// technique or bowl type as a numeric code). Anything else becomes `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn count(value: Option<f64>) -> u32 {
    value
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u32)
        .unwrap_or(0)
}

fn rate(value: Option<f64>) -> f64 {
    value.filter(|v| *v >= 0.0).unwrap_or(0.0)
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

/// Outcome of converting one raw array element.
#[derive(Debug)]
pub(crate) enum Row<T> {
    Record(T),
    /// Null element or an element without a player name.
    Skipped,
}

fn ensure_object(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Object(_) => Ok(true),
        other => Err(format!("expected an object, found {}", json_kind(other))),
    }
}

pub(crate) fn batting_row(value: &Value) -> Result<Row<BattingRecord>, String> {
    if !ensure_object(value)? {
        return Ok(Row::Skipped);
    }
    let raw = RawBatting::deserialize(value).map_err(|e| e.to_string())?;
    let Some(player) = non_empty(raw.player).or_else(|| non_empty(raw.player_capitalised)) else {
        return Ok(Row::Skipped);
    };
    Ok(Row::Record(BattingRecord {
        player,
        runs: count(raw.runs),
        balls_faced: count(raw.bf),
        strike_rate: rate(raw.sr),
        average: raw.avg,
        wickets_lost: count(raw.wks),
        matches: count(raw.matches),
        innings: count(raw.innings),
        matches_recorded: raw.matches.is_some(),
        innings_recorded: raw.innings.is_some(),
        technique: non_empty(raw.technique),
    }))
}

pub(crate) fn bowling_row(value: &Value) -> Result<Row<BowlingRecord>, String> {
    if !ensure_object(value)? {
        return Ok(Row::Skipped);
    }
    let raw = RawBowling::deserialize(value).map_err(|e| e.to_string())?;
    let Some(player) = non_empty(raw.Player).or_else(|| non_empty(raw.player_lowercase)) else {
        return Ok(Row::Skipped);
    };
    Ok(Row::Record(BowlingRecord {
        player,
        bowl_type: non_empty(raw.BowlType).unwrap_or_else(|| "Unknown".to_string()),
        runs_conceded: count(raw.Runs),
        balls_bowled: count(raw.BF),
        wickets: count(raw.Wks),
        run_rate: rate(raw.RR),
        strike_rate: rate(raw.SR),
        dot_pct: rate(raw.dot_pct),
        boundary_pct: rate(raw.boundary_pct),
        avg_speed_kph: raw.avg_kph,
        span: YearSpan::parse(raw.Span.as_deref().unwrap_or("")),
    }))
}

pub(crate) fn matchup_row(value: &Value) -> Result<Row<MatchupRecord>, String> {
    if !ensure_object(value)? {
        return Ok(Row::Skipped);
    }
    let raw = RawMatchup::deserialize(value).map_err(|e| e.to_string())?;
    let (Some(batsman), Some(bowler)) = (non_empty(raw.batsman), non_empty(raw.bowler)) else {
        return Ok(Row::Skipped);
    };
    Ok(Row::Record(MatchupRecord {
        batsman,
        bowler,
        runs: count(raw.runs),
        balls: count(raw.bf),
        strike_rate: rate(raw.sr),
        wickets: count(raw.wks),
        advantage: Advantage::from_label(raw.advantage.as_deref()),
    }))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record<T>(row: Row<T>) -> T {
        match row {
            Row::Record(r) => r,
            Row::Skipped => panic!("expected a record"),
        }
    }

    #[test]
    fn batting_row_with_all_fields() {
        let v = json!({
            "player": "A Khan", "runs": 50, "bf": 30, "sr": 166.7, "avg": 25.0,
            "wks": 2, "matches": 4, "innings": 4, "technique": "Aggressive"
        });
        let r = record(batting_row(&v).unwrap());
        assert_eq!(r.player, "A Khan");
        assert_eq!(r.runs, 50);
        assert_eq!(r.balls_faced, 30);
        assert!((r.strike_rate - 166.7).abs() < 1e-9);
        assert_eq!(r.average, Some(25.0));
        assert_eq!(r.wickets_lost, 2);
        assert_eq!(r.technique.as_deref(), Some("Aggressive"));
    }

    #[test]
    fn null_average_stays_absent() {
        let v = json!({ "player": "B", "runs": 10, "avg": null });
        let r = record(batting_row(&v).unwrap());
        assert_eq!(r.average, None);
        assert_eq!(r.balls_faced, 0);
        assert_eq!(r.strike_rate, 0.0);
    }

    #[test]
    fn placeholder_average_is_absent() {
        let v = json!({ "player": "B", "avg": "-" , "runs": "12"});
        let r = record(batting_row(&v).unwrap());
        assert_eq!(r.average, None);
        assert_eq!(r.runs, 12);
    }

    #[test]
    fn batting_row_accepts_capitalised_player() {
        let v = json!({ "Player": "C", "runs": 5 });
        assert_eq!(record(batting_row(&v).unwrap()).player, "C");
    }

    #[test]
    fn rows_without_player_are_skipped() {
        assert!(matches!(batting_row(&json!({ "runs": 5 })).unwrap(), Row::Skipped));
        assert!(matches!(batting_row(&json!({ "player": "  " })).unwrap(), Row::Skipped));
        assert!(matches!(bowling_row(&json!({ "Runs": 5 })).unwrap(), Row::Skipped));
        assert!(matches!(bowling_row(&Value::Null).unwrap(), Row::Skipped));
    }

    #[test]
    fn non_object_rows_are_malformed() {
        assert!(batting_row(&json!(42)).is_err());
        assert!(bowling_row(&json!("Rashid")).is_err());
        assert!(matchup_row(&json!([1, 2])).is_err());
    }

    #[test]
    fn both_player_spellings_use_the_first_present() {
        let v = json!({ "player": "A", "Player": "B", "runs": 5 });
        assert_eq!(record(batting_row(&v).unwrap()).player, "A");

        let v = json!({ "player": null, "Player": "B" });
        assert_eq!(record(batting_row(&v).unwrap()).player, "B");

        let v = json!({ "Player": "Rashid", "player": "R Khan", "RR": 6.5 });
        assert_eq!(record(bowling_row(&v).unwrap()).player, "Rashid");
    }

    #[test]
    fn numeric_text_fields_do_not_fail_the_row() {
        let r = record(batting_row(&json!({ "player": "A", "technique": 3 })).unwrap());
        assert_eq!(r.technique.as_deref(), Some("3"));

        let r = record(batting_row(&json!({ "player": "B", "technique": [1] })).unwrap());
        assert_eq!(r.technique, None);

        let r = record(bowling_row(&json!({ "Player": "Z", "BowlType": 1 })).unwrap());
        assert_eq!(r.bowl_type, "1");

        let r = record(bowling_row(&json!({ "Player": "Y", "BowlType": false })).unwrap());
        assert_eq!(r.bowl_type, "Unknown");

        let v = json!({ "batsman": "A", "bowler": 99, "advantage": 1 });
        let r = record(matchup_row(&v).unwrap());
        assert_eq!(r.bowler, "99");
        assert_eq!(r.advantage, Advantage::Neutral);
    }

    #[test]
    fn appearance_counts_remember_whether_they_were_present() {
        let r = record(batting_row(&json!({ "player": "A", "matches": 0, "innings": "-" })).unwrap());
        assert!(r.matches_recorded);
        assert!(!r.innings_recorded);

        let r = record(batting_row(&json!({ "player": "B", "innings": 4 })).unwrap());
        assert!(!r.matches_recorded);
        assert!(r.innings_recorded);
        assert_eq!(r.innings, 4);
    }

    #[test]
    fn non_string_player_is_malformed() {
        assert!(batting_row(&json!({ "player": 7 })).is_err());
    }

    #[test]
    fn bowling_row_reads_source_columns() {
        let v = json!({
            "Player": "Rashid", "BowlType": "Leg spin", "Runs": 120, "BF": 96,
            "Wks": 8, "RR": 7.5, "SR": 12.0, "Dot%": 41.2, "Bnd%": 12.5,
            "Ave kph": 92.3, "Span": "2024-2025"
        });
        let r = record(bowling_row(&v).unwrap());
        assert_eq!(r.bowl_type, "Leg spin");
        assert_eq!(r.runs_conceded, 120);
        assert_eq!(r.balls_bowled, 96);
        assert_eq!(r.wickets, 8);
        assert_eq!(r.avg_speed_kph, Some(92.3));
        assert_eq!(r.span.raw, "2024-2025");
        assert_eq!(r.span.years.len(), 2);
    }

    #[test]
    fn numeric_span_is_accepted() {
        let v = json!({ "Player": "X", "Span": 2025 });
        let r = record(bowling_row(&v).unwrap());
        assert_eq!(r.span.raw, "2025");
        assert!(r.span.years.contains(&2025));
    }

    #[test]
    fn missing_bowl_type_defaults_to_unknown() {
        let r = record(bowling_row(&json!({ "Player": "X" })).unwrap());
        assert_eq!(r.bowl_type, "Unknown");
        assert!(r.span.years.is_empty());
    }

    #[test]
    fn advantage_labels() {
        assert_eq!(Advantage::from_label(Some("batsman")), Advantage::Batsman);
        assert_eq!(Advantage::from_label(Some("Bowler")), Advantage::Bowler);
        assert_eq!(Advantage::from_label(Some("even")), Advantage::Neutral);
        assert_eq!(Advantage::from_label(None), Advantage::Neutral);
    }

    #[test]
    fn matchup_row_requires_both_names() {
        let v = json!({ "batsman": "A", "runs": 20, "bf": 12, "sr": 166.6, "wks": 0 });
        assert!(matches!(matchup_row(&v).unwrap(), Row::Skipped));

        let v = json!({ "batsman": "A", "bowler": "Z", "runs": 20, "bf": 12,
                        "sr": 166.6, "wks": 1, "advantage": "batsman" });
        let r = record(matchup_row(&v).unwrap());
        assert_eq!(r.balls, 12);
        assert_eq!(r.advantage, Advantage::Batsman);
    }
}
