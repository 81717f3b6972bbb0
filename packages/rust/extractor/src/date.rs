//! Match start-time rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Rendered form of a parsed start time.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Placeholder when a record has no start time.
pub const UNKNOWN_DATE: &str = "Unknown";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Render a record's `startTime` for display.
///
/// Absent, `null`, or empty → `Unknown`. Non-string values are printed as-is.
pub fn format_match_date(start_time: Option<&Value>) -> String {
    match start_time {
        None | Some(Value::Null) => UNKNOWN_DATE.to_string(),
        Some(Value::String(s)) if s.is_empty() => UNKNOWN_DATE.to_string(),
        Some(Value::String(s)) => format_start_time(s),
        Some(other) => other.to_string(),
    }
}

/// `2024-06-01T12:30:00Z` → `2024-06-01 12:30 UTC`. Unparseable input is
/// returned unchanged.
pub fn format_start_time(raw: &str) -> String {
    match parse_start_time(raw) {
        Some(parsed) => parsed.format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Parse an ISO-8601 timestamp. A trailing `Z` means UTC, explicit offsets
/// are converted to UTC, and timestamps without an offset are taken as UTC.
///
/// Offset timestamps are shifted, not relabelled: `14:30+02:00` becomes
/// `12:30 UTC` rather than keeping the `14:30` wall-clock time.
pub fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let with_offset = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => raw.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn zulu_timestamp_is_reformatted() {
        assert_eq!(format_start_time("2024-06-01T12:30:00Z"), "2024-06-01 12:30 UTC");
        assert_eq!(
            format_start_time("2024-06-01T12:30:59.123456Z"),
            "2024-06-01 12:30 UTC"
        );
    }

    #[test]
    fn offsets_are_converted_to_utc() {
        assert_eq!(
            format_start_time("2024-06-01T14:30:00+02:00"),
            "2024-06-01 12:30 UTC"
        );
        assert_eq!(format_start_time("2024-06-01T12:30Z"), "2024-06-01 12:30 UTC");
    }

    #[test]
    fn naive_and_date_only_inputs_are_taken_as_utc() {
        assert_eq!(format_start_time("2024-06-01T12:30:00"), "2024-06-01 12:30 UTC");
        assert_eq!(format_start_time("2024-06-01 08:05:00"), "2024-06-01 08:05 UTC");
        assert_eq!(format_start_time("2024-06-01"), "2024-06-01 00:00 UTC");
    }

    #[test]
    fn unparseable_input_passes_through() {
        assert_eq!(format_start_time("not-a-date"), "not-a-date");
        assert_eq!(format_start_time("2024-13-45T99:00:00Z"), "2024-13-45T99:00:00Z");
    }

    #[test]
    fn absent_or_empty_start_time_is_unknown() {
        assert_eq!(format_match_date(None), "Unknown");
        assert_eq!(format_match_date(Some(&json!(null))), "Unknown");
        assert_eq!(format_match_date(Some(&json!(""))), "Unknown");
        assert_eq!(format_match_date(Some(&json!(1717245000))), "1717245000");
    }
}
