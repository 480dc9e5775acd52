//! Event normalization
//!
//! Validates and canonicalizes caller events before they reach the backend.
//! Malformed single entries are dropped with a warning instead of failing the
//! whole submission.

use crate::error::NormalizationWarning;
use crate::types::{CreationEvent, NormalizedEvent};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Naive date-time layouts accepted in addition to RFC 3339, interpreted as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Output of [`normalize`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Surviving events, ascending by instant, ties in input order
    pub events: Vec<NormalizedEvent>,
    /// One warning per dropped event
    pub warnings: Vec<NormalizationWarning>,
}

impl Normalized {
    /// Check whether no event survived
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Normalize caller events
///
/// Trims descriptions and media references, parses timestamps and sorts the
/// survivors. Pure: the same input always yields the same output.
#[must_use]
pub fn normalize(events: &[CreationEvent]) -> Normalized {
    let mut out = Normalized::default();

    for (index, event) in events.iter().enumerate() {
        let description = event.description.trim();
        if description.is_empty() {
            tracing::warn!(index, "dropping event with empty description");
            out.warnings
                .push(NormalizationWarning::EmptyDescription { index });
            continue;
        }

        let Some(timestamp) = parse_timestamp(&event.timestamp) else {
            tracing::warn!(
                index,
                raw = %event.timestamp,
                "dropping event with unparsable timestamp"
            );
            out.warnings.push(NormalizationWarning::UnparsableTimestamp {
                index,
                raw: event.timestamp.clone(),
            });
            continue;
        };

        let media_url = event
            .media_url
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        out.events.push(NormalizedEvent {
            index,
            timestamp,
            description: description.to_string(),
            media_url,
        });
    }

    // Vec::sort_by_key is stable
    out.events.sort_by_key(|e| e.timestamp);

    tracing::debug!(
        kept = out.events.len(),
        dropped = out.warnings.len(),
        "normalized creation events"
    );
    out
}

/// Parse a caller or backend timestamp into a UTC instant
///
/// Accepts RFC 3339, naive date-times (UTC), bare dates (midnight UTC) and
/// integer Unix epoch milliseconds.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    // Short digit runs are more likely a bare year than epoch millis
    if raw.len() >= 10 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn parse_accepts_supported_forms() {
        let rfc = parse_timestamp("2023-01-05T10:00:00+02:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2023-01-05T08:00:00+00:00");

        let naive = parse_timestamp("2023-01-05 10:00:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2023-01-05T10:00:00+00:00");

        let date = parse_timestamp("2023-01-05").unwrap();
        assert_eq!(date.day(), 5);

        let epoch = parse_timestamp("1672531200000").unwrap();
        assert_eq!(epoch.to_rfc3339(), "2023-01-01T00:00:00+00:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2023-13-45").is_none());
        assert!(parse_timestamp("2023").is_none());
    }

    #[test]
    fn normalize_drops_and_warns() {
        let events = vec![
            CreationEvent::new("2023-01-05", "  First draft  "),
            CreationEvent::new("2023-01-02", "   "),
            CreationEvent::new("not a date", "Lost"),
            CreationEvent::new("2023-01-01", "Sketch idea").with_media("  "),
        ];

        let out = normalize(&events);
        assert_eq!(out.events.len(), 2);
        assert_eq!(out.events[0].description, "Sketch idea");
        assert_eq!(out.events[0].index, 3);
        assert!(out.events[0].media_url.is_none());
        assert_eq!(out.events[1].description, "First draft");
        assert_eq!(
            out.warnings,
            vec![
                NormalizationWarning::EmptyDescription { index: 1 },
                NormalizationWarning::UnparsableTimestamp {
                    index: 2,
                    raw: "not a date".into()
                },
            ]
        );
    }

    #[test]
    fn normalize_ties_keep_input_order() {
        let events = vec![
            CreationEvent::new("2023-01-01", "b"),
            CreationEvent::new("2022-12-31", "a"),
            CreationEvent::new("2023-01-01T00:00:00Z", "c"),
        ];

        let out = normalize(&events);
        let order: Vec<_> = out.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn normalize_empty_input() {
        let out = normalize(&[]);
        assert!(out.is_empty());
        assert!(out.warnings.is_empty());
    }
}
