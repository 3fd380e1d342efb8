// Composite matchup keys: `<TEAM>[_<opponent tag>]_<PHASE>`.
//
// The phase is read from the key suffix. `_Post_PP` is checked before `_PP`
// so that post-powerplay keys are never misread as powerplay ones.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::teams::TeamRegistry;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Match segment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Overs 1-6.
    #[serde(rename = "PP")]
    Powerplay,
    /// Overs 7-20.
    #[serde(rename = "Post_PP")]
    PostPowerplay,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Powerplay, Phase::PostPowerplay];

    /// The code used in raw keys (`PP` / `Post_PP`).
    pub fn code(&self) -> &'static str {
        match self {
            Phase::Powerplay => "PP",
            Phase::PostPowerplay => "Post_PP",
        }
    }

    /// Human-readable label for prompts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Powerplay => "Powerplay (overs 1-6)",
            Phase::PostPowerplay => "Post powerplay (overs 7-20)",
        }
    }

    pub fn from_code(code: &str) -> Option<Phase> {
        match code {
            "PP" => Some(Phase::Powerplay),
            "Post_PP" => Some(Phase::PostPowerplay),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// MatchupKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("matchup key `{key}` does not end in a phase code (_PP or _Post_PP)")]
    MissingPhase { key: String },

    #[error("matchup key `{key}` has no team code")]
    MissingTeam { key: String },

    #[error("matchup key `{key}` references unknown team code `{team}`")]
    UnknownTeam { key: String, team: String },
}

/// Parsed composite identifier of one matchup block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchupKey {
    /// The key exactly as it appeared in the input document.
    pub raw: String,
    pub team: String,
    /// Everything between the team code and the phase, e.g. `vs_GG`.
    pub opponent_tag: Option<String>,
    pub phase: Phase,
}

impl MatchupKey {
    /// Parse and validate a raw key against the known team codes.
    pub fn parse(raw: &str, teams: &TeamRegistry) -> Result<Self, KeyError> {
        let (head, phase) = if let Some(head) = raw.strip_suffix("_Post_PP") {
            (head, Phase::PostPowerplay)
        } else if let Some(head) = raw.strip_suffix("_PP") {
            (head, Phase::Powerplay)
        } else {
            return Err(KeyError::MissingPhase {
                key: raw.to_string(),
            });
        };

        let (team, opponent_tag) = match head.split_once('_') {
            Some((team, rest)) if !rest.is_empty() => (team, Some(rest.to_string())),
            Some((team, _)) => (team, None),
            None => (head, None),
        };

        if team.is_empty() {
            return Err(KeyError::MissingTeam {
                key: raw.to_string(),
            });
        }
        if !teams.contains(team) {
            return Err(KeyError::UnknownTeam {
                key: raw.to_string(),
                team: team.to_string(),
            });
        }

        Ok(MatchupKey {
            raw: raw.to_string(),
            team: team.to_string(),
            opponent_tag,
            phase,
        })
    }

    /// Whether the opponent tag names `code` as one of its `_`-separated
    /// tokens (`vs_GG` names `GG`).
    pub fn names_opponent(&self, code: &str) -> bool {
        self.opponent_tag
            .as_deref()
            .is_some_and(|tag| tag.split('_').any(|token| token == code))
    }
}

impl fmt::Display for MatchupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams() -> TeamRegistry {
        TeamRegistry::default()
    }

    #[test]
    fn parses_team_opponent_and_powerplay() {
        let key = MatchupKey::parse("DC_vs_GG_PP", &teams()).unwrap();
        assert_eq!(key.team, "DC");
        assert_eq!(key.opponent_tag.as_deref(), Some("vs_GG"));
        assert_eq!(key.phase, Phase::Powerplay);
        assert_eq!(key.raw, "DC_vs_GG_PP");
    }

    #[test]
    fn post_pp_suffix_is_not_read_as_pp() {
        let key = MatchupKey::parse("MIE_batting_Post_PP", &teams()).unwrap();
        assert_eq!(key.team, "MIE");
        assert_eq!(key.opponent_tag.as_deref(), Some("batting"));
        assert_eq!(key.phase, Phase::PostPowerplay);
    }

    #[test]
    fn key_without_opponent_tag() {
        let key = MatchupKey::parse("SW_PP", &teams()).unwrap();
        assert_eq!(key.team, "SW");
        assert!(key.opponent_tag.is_none());
    }

    #[test]
    fn missing_phase_is_rejected() {
        let err = MatchupKey::parse("DC_vs_GG", &teams()).unwrap_err();
        assert!(matches!(err, KeyError::MissingPhase { .. }));
    }

    #[test]
    fn missing_team_is_rejected() {
        let err = MatchupKey::parse("_PP", &teams()).unwrap_err();
        assert!(matches!(err, KeyError::MissingTeam { .. }));
    }

    #[test]
    fn unknown_team_is_rejected() {
        let err = MatchupKey::parse("MI_vs_DC_PP", &teams()).unwrap_err();
        assert_eq!(
            err,
            KeyError::UnknownTeam {
                key: "MI_vs_DC_PP".to_string(),
                team: "MI".to_string(),
            }
        );
    }

    #[test]
    fn names_opponent_matches_whole_tokens_only() {
        let key = MatchupKey::parse("DC_vs_GG_PP", &teams()).unwrap();
        assert!(key.names_opponent("GG"));
        assert!(!key.names_opponent("G"));
        assert!(!key.names_opponent("DC"));
    }

    #[test]
    fn phase_codes_round_trip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_code(phase.code()), Some(phase));
        }
        assert_eq!(Phase::from_code("Death"), None);
    }
}
