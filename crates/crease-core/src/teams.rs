// Known team codes and their display names.

use std::collections::BTreeMap;

/// The set of team codes a dataset may reference, with display names.
///
/// Codes are the leading token of every composite matchup key. A key whose
/// team code is not registered here is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRegistry {
    names: BTreeMap<String, String>,
}

impl TeamRegistry {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// Whether `code` is a registered team code (case-sensitive).
    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(code)
    }

    /// Display name for a team code, falling back to the code itself.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Registered codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TeamRegistry {
    fn default() -> Self {
        let names = [
            ("ADKR", "Abu Dhabi Knight Riders"),
            ("DC", "Desert Capitals"),
            ("GG", "Gulf Giants"),
            ("MIE", "MI Emirates"),
            ("SW", "Sharjah Warriors"),
            ("DV", "Dubai Vipers"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();
        Self { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_six_teams() {
        let teams = TeamRegistry::default();
        assert_eq!(teams.len(), 6);
        assert!(teams.contains("MIE"));
        assert!(!teams.contains("MI"));
    }

    #[test]
    fn display_name_falls_back_to_code() {
        let teams = TeamRegistry::default();
        assert_eq!(teams.display_name("DC"), "Desert Capitals");
        assert_eq!(teams.display_name("XYZ"), "XYZ");
    }

    #[test]
    fn codes_are_sorted() {
        let teams = TeamRegistry::default();
        let codes: Vec<&str> = teams.codes().collect();
        assert_eq!(codes, vec!["ADKR", "DC", "DV", "GG", "MIE", "SW"]);
    }
}
