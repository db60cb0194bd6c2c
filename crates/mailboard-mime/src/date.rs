//! `Date:` header parsing.

use chrono::{DateTime, FixedOffset};

/// Formats seen in the wild that RFC 2822 parsing rejects.
const FALLBACK_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%a %b %d %H:%M:%S %Y %z",
];

/// Parses an RFC 5322 date, tolerating trailing comments like `(UTC)`
/// and a few common deviations.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = strip_comments(value);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(cleaned) {
        return Some(date);
    }

    let normalized = normalize_zone(cleaned);
    FALLBACK_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
}

fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0_u32;
    for ch in value.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrites a trailing `GMT`/`UTC`/`UT` zone to `+0000`.
fn normalize_zone(value: &str) -> String {
    for zone in ["GMT", "UTC", "UT", "Z"] {
        if let Some(rest) = value.strip_suffix(zone)
            && rest.ends_with(' ')
        {
            return format!("{rest}+0000");
        }
    }
    value.to_string()
}
