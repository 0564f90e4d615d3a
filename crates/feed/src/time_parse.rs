// ABOUTME: Timestamp normalization for feed items into UTC instants.
// ABOUTME: Each site declares its format; sources that omit the offset supply a fallback one.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FeedError;

static OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("valid offset regex"));

/// The timestamp format a feed is known to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateFormat {
    /// RFC 2822, the usual RSS `pubDate` shape: "Mon, 15 Jan 2024 10:00:00 +0300".
    #[default]
    Rfc2822,
    /// RFC 3339 / ISO 8601 with offset.
    Rfc3339,
    /// A chrono strftime pattern. When the value carries no offset it is read
    /// as local time in `utc_offset` (UTC when unset).
    Pattern {
        pattern: String,
        #[serde(default)]
        utc_offset: Option<String>,
    },
    /// Best-effort cascade over common RSS/Atom shapes.
    Flexible,
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormat::Rfc2822 => write!(f, "RFC 2822"),
            DateFormat::Rfc3339 => write!(f, "RFC 3339"),
            DateFormat::Pattern {
                pattern,
                utc_offset: Some(offset),
            } => write!(f, "{:?} at {}", pattern, offset),
            DateFormat::Pattern { pattern, .. } => write!(f, "{:?}", pattern),
            DateFormat::Flexible => write!(f, "any common feed date"),
        }
    }
}

/// Parses `value` according to `format` and converts it to UTC.
pub fn normalize_timestamp(value: &str, format: &DateFormat) -> Result<DateTime<Utc>, FeedError> {
    let value = value.trim();
    let malformed = || FeedError::MalformedTimestamp {
        value: value.to_string(),
        format: format.to_string(),
    };

    let parsed = match format {
        DateFormat::Rfc2822 => DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        DateFormat::Pattern {
            pattern,
            utc_offset,
        } => {
            let fallback = match utc_offset {
                Some(raw) => parse_utc_offset(raw)?,
                None => utc(),
            };
            parse_with_pattern(value, pattern, fallback)
        }
        DateFormat::Flexible => parse_flexible_time(value),
    };

    parsed.ok_or_else(malformed)
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is valid")
}

fn parse_with_pattern(value: &str, pattern: &str, fallback: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(value, pattern) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, pattern).ok()?;
    let local = fallback.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

/// Parses offsets written as "+11:00", "+1100", "-0330", "Z" or "UTC".
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, FeedError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }
    let invalid = || FeedError::InvalidOffset(raw.to_string());
    let caps = OFFSET_RE.captures(raw).ok_or_else(invalid)?;
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    let seconds = (hours * 3600 + minutes * 60) * if &caps[1] == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

/// Shapes with a numeric offset, tried after the RFC parsers.
const OFFSET_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %e %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%e %b %Y %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Shapes without an offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%e %b %Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Named zones seen in RSS dates. chrono's %Z does not parse these.
const NAMED_ZONES: &[(&str, i32)] = &[
    ("GMT", 0),
    ("UTC", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("MSK", 3 * 3600),
    ("VLAT", 10 * 3600),
    ("MAGT", 11 * 3600),
];

/// Tries the common RSS/Atom date shapes in turn. Used by sites declared with
/// the `flexible` format.
pub fn parse_flexible_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_with_named_zone(s) {
        return Some(dt);
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }

    let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn parse_with_named_zone(s: &str) -> Option<DateTime<Utc>> {
    let (base, seconds) = NAMED_ZONES.iter().find_map(|(name, seconds)| {
        s.strip_suffix(name)
            .filter(|base| base.ends_with(' '))
            .map(|base| (base.trim_end(), *seconds))
    })?;
    let offset = FixedOffset::east_opt(seconds)?;
    ["%a, %d %b %Y %H:%M:%S", "%a, %e %b %Y %H:%M:%S", "%d %b %Y %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(base, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn pattern(p: &str, offset: Option<&str>) -> DateFormat {
        DateFormat::Pattern {
            pattern: p.to_string(),
            utc_offset: offset.map(String::from),
        }
    }

    #[test]
    fn rfc2822_converts_to_utc() {
        let dt = normalize_timestamp("Mon, 15 Jan 2024 10:00:00 +0300", &DateFormat::Rfc2822).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T07:00:00+00:00");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let dt = normalize_timestamp("\n  Mon, 15 Jan 2024 10:00:00 +0000 ", &DateFormat::Rfc2822).unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn pattern_without_offset_uses_fallback() {
        let fmt = pattern("%a, %d %b %Y %H:%M:%S", Some("+11:00"));
        let dt = normalize_timestamp("Tue, 16 Jan 2024 09:30:00", &fmt).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T22:30:00+00:00");
    }

    #[test]
    fn pattern_with_offset_in_value_ignores_fallback() {
        let fmt = pattern("%a, %d %b %Y %H:%M:%S %z", Some("+11:00"));
        let dt = normalize_timestamp("Tue, 16 Jan 2024 09:30:00 +0000", &fmt).unwrap();
        assert_eq!(dt.hour(), 9);
    }

    #[test]
    fn pattern_without_fallback_reads_utc() {
        let fmt = pattern("%d.%m.%Y %H:%M", None);
        let dt = normalize_timestamp("05.02.2024 18:45", &fmt).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-02-05T18:45:00+00:00");
    }

    #[test]
    fn mismatch_is_malformed() {
        let err = normalize_timestamp("yesterday", &DateFormat::Rfc2822).unwrap_err();
        assert!(err.is_malformed_timestamp());
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn bad_fallback_offset_is_reported() {
        let fmt = pattern("%d.%m.%Y %H:%M", Some("+25:99"));
        let err = normalize_timestamp("05.02.2024 18:45", &fmt).unwrap_err();
        assert!(matches!(err, FeedError::InvalidOffset(_)));
    }

    #[test]
    fn offset_shapes() {
        assert_eq!(parse_utc_offset("+1100").unwrap().local_minus_utc(), 11 * 3600);
        assert_eq!(parse_utc_offset("-03:30").unwrap().local_minus_utc(), -(3 * 3600 + 1800));
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("eleven").is_err());
    }

    #[test]
    fn flexible_covers_named_zones_and_naive() {
        let dt = parse_flexible_time("Mon, 02 Jan 2006 15:04:05 MSK").unwrap();
        assert_eq!(dt.hour(), 12);
        assert!(parse_flexible_time("2006-01-02 15:04:05").is_some());
        assert!(parse_flexible_time("2006-01-02").is_some());
        assert!(parse_flexible_time("").is_none());
        assert!(parse_flexible_time("not a date").is_none());
    }

    #[test]
    fn format_deserializes_from_tagged_json() {
        let fmt: DateFormat = serde_json::from_str(
            r#"{"kind":"pattern","pattern":"%a, %d %b %Y %H:%M:%S","utc_offset":"+11:00"}"#,
        )
        .unwrap();
        assert_eq!(fmt, pattern("%a, %d %b %Y %H:%M:%S", Some("+11:00")));
        let fmt: DateFormat = serde_json::from_str(r#"{"kind":"rfc2822"}"#).unwrap();
        assert_eq!(fmt, DateFormat::Rfc2822);
    }
}
