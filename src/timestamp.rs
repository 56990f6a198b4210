// src/timestamp.rs
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Parse an ISO-8601 timestamp with an explicit offset. A literal `Z` suffix is
/// the same instant as `+00:00`.
pub fn parse_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

/// Like [`parse_offset`], but a timestamp without any offset is read as UTC.
pub fn parse_lenient(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Some(dt) = parse_offset(s) {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

pub fn now_fixed() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_suffix_equals_explicit_utc_offset() {
        let z = parse_offset("2025-03-01T17:00:00Z").unwrap();
        let plus = parse_offset("2025-03-01T17:00:00+00:00").unwrap();
        assert_eq!(z, plus);
        assert_eq!(z.offset().local_minus_utc(), 0);
    }

    #[test]
    fn strict_parser_rejects_naive() {
        assert!(parse_offset("2025-03-01T17:00:00").is_none());
        assert!(parse_offset("not a date").is_none());
    }

    #[test]
    fn lenient_parser_reads_naive_as_utc() {
        let naive = parse_lenient("2024-01-01T00:00:00").unwrap();
        let z = parse_lenient("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(naive, z);
        assert!(parse_lenient("2024-01-01T00:00:00.250").is_some());
        assert!(parse_lenient("yesterday").is_none());
    }

    #[test]
    fn offsets_are_preserved() {
        let dt = parse_lenient("2024-01-01T23:30:00-05:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }
}
