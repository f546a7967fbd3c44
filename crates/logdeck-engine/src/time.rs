use chrono::{DateTime, NaiveDateTime, Timelike};

/// Parse an event timestamp into a comparable instant.
///
/// Accepts RFC 3339 (normalized to UTC) and zone-less
/// `YYYY-MM-DDTHH:MM:SS[,.]fff`. Comma fractions are treated like dot
/// fractions.
pub fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    let normalized = timestamp.trim().replacen(',', ".", 1);
    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(ts.naive_utc());
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Parse and truncate to the whole second
pub fn parse_second(timestamp: &str) -> Option<NaiveDateTime> {
    parse_timestamp(timestamp).and_then(|ts| ts.with_nanosecond(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_fraction() {
        let a = parse_timestamp("2024-01-01T10:00:00,500").unwrap();
        let b = parse_timestamp("2024-01-01T10:00:00,050").unwrap();
        assert!(a > b);
        assert_eq!(a.and_utc().timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_variants() {
        assert!(parse_timestamp("2024-01-15T10:30:00.123456789Z").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00").is_some());
        assert!(parse_timestamp("2024-01-15 10:30:00,001").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_second_truncates() {
        assert_eq!(
            parse_second("2024-01-01T10:00:00,999"),
            parse_second("2024-01-01T10:00:00,000")
        );
    }
}
