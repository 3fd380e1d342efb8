// Season span strings attached to bowling rows ("2025", "2024-2025").
//
// A two-token span yields its two endpoints only, never the years in between.
// Anything else that is not a plain number yields an empty set.

use std::collections::BTreeSet;

/// Extract the calendar years named by a raw span string.
pub fn parse_span(raw: &str) -> BTreeSet<i32> {
    let raw = raw.trim();
    let mut years = BTreeSet::new();
    if raw.is_empty() {
        return years;
    }

    if raw.contains('-') {
        let mut parts = raw.split('-');
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return years;
        };
        if let (Some(start), Some(end)) = (parse_year(start), parse_year(end)) {
            years.insert(start);
            years.insert(end);
        }
    } else if let Some(year) = parse_year(raw) {
        years.insert(year);
    }

    years
}

/// Whether any requested year appears as a substring of the raw span.
///
/// This is string containment, not interval logic: `"2023-2025"` does not
/// match 2024.
pub fn span_mentions_any(raw: &str, years: &BTreeSet<i32>) -> bool {
    years.iter().any(|year| raw.contains(&year.to_string()))
}

fn parse_year(token: &str) -> Option<i32> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
