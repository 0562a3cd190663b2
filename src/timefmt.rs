// src/timefmt.rs
//
// Wire timestamp codec. Every timestamp the stores carry is a civil
// datetime string, "YYYY-MM-DD hh:mm AM/PM", interpreted at IST
// (UTC+5:30) — the ingestion hardware converts GPS time to IST before
// writing. The exit-timestamp field additionally accepts the sentinel
// "still-active" for a violation with no observed exit.

use crate::error::ParseError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WIRE_FORMAT: &str = "%Y-%m-%d %I:%M %p";
pub const STILL_ACTIVE: &str = "still-active";

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn ist_offset() -> FixedOffset {
    // +05:30 is always in range for FixedOffset.
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset in range")
}

pub fn now_ist() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ist_offset())
}

pub fn parse_wire(raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), WIRE_FORMAT)
        .map_err(|_| ParseError::Timestamp(raw.to_string()))?;
    naive
        .and_local_timezone(ist_offset())
        .single()
        .ok_or_else(|| ParseError::Timestamp(raw.to_string()))
}

pub fn format_wire(ts: DateTime<FixedOffset>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Exit timestamp of a violation: either an observed wire timestamp or
/// the open-violation sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExitTime {
    StillActive,
    At(String),
}

impl ExitTime {
    pub fn as_wire(&self) -> &str {
        match self {
            ExitTime::StillActive => STILL_ACTIVE,
            ExitTime::At(raw) => raw,
        }
    }
}

impl From<ExitTime> for String {
    fn from(value: ExitTime) -> Self {
        value.as_wire().to_string()
    }
}

impl TryFrom<String> for ExitTime {
    type Error = ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw == STILL_ACTIVE {
            return Ok(ExitTime::StillActive);
        }
        parse_wire(&raw)?;
        Ok(ExitTime::At(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_morning_timestamp() {
        let ts = parse_wire("2024-01-01 10:00 AM").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.offset().local_minus_utc(), IST_OFFSET_SECS);
    }

    #[test]
    fn test_parse_afternoon_timestamp() {
        let ts = parse_wire("2024-01-01 02:30 PM").unwrap();
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn test_roundtrip() {
        let raw = "2024-06-15 11:45 PM";
        assert_eq!(format_wire(parse_wire(raw).unwrap()), raw);
    }

    #[test]
    fn test_malformed_timestamps_rejected() {
        assert!(parse_wire("2024-01-01T10:00:00Z").is_err());
        assert!(parse_wire("yesterday").is_err());
        assert!(parse_wire("").is_err());
        // 24h clock without AM/PM is not the wire format
        assert!(parse_wire("2024-01-01 22:00").is_err());
    }

    #[test]
    fn test_elapsed_between_wire_timestamps() {
        let entry = parse_wire("2024-01-01 10:00 AM").unwrap();
        let now = parse_wire("2024-01-01 10:03 AM").unwrap();
        assert_eq!((now - entry).num_minutes(), 3);
    }

    #[test]
    fn test_exit_time_sentinel() {
        let exit = ExitTime::try_from(STILL_ACTIVE.to_string()).unwrap();
        assert_eq!(exit, ExitTime::StillActive);
        assert_eq!(exit.as_wire(), "still-active");
    }

    #[test]
    fn test_exit_time_formatted() {
        let exit = ExitTime::try_from("2024-01-01 10:05 AM".to_string()).unwrap();
        assert_eq!(exit, ExitTime::At("2024-01-01 10:05 AM".to_string()));
    }

    #[test]
    fn test_exit_time_garbage_rejected() {
        assert!(ExitTime::try_from("closed".to_string()).is_err());
    }
}
