//! Time index normalization.
//!
//! Time-mode logs compare and store index values as signed microseconds since
//! the Unix epoch. Calendar values only exist at the edges (parsing inbound
//! text, formatting outbound text).
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};

/// Normalize a timestamp to microseconds since the Unix epoch.
pub fn to_unix_micros<Tz: TimeZone>(time: &DateTime<Tz>) -> i64 {
    time.timestamp_micros()
}

/// Inverse of [`to_unix_micros`], expressed in `offset` (UTC when `None`).
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_unix_micros(micros: i64, offset: Option<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let utc = DateTime::<Utc>::from_timestamp_micros(micros)?;
    Some(match offset {
        Some(offset) => utc.with_timezone(&offset),
        None => utc.fixed_offset(),
    })
}

/// Parse an RFC 3339 time index, returning microseconds and the original offset.
pub fn parse_time_index(text: &str) -> Result<(i64, FixedOffset), chrono::ParseError> {
    let parsed = DateTime::parse_from_rfc3339(text.trim())?;
    Ok((to_unix_micros(&parsed), *parsed.offset()))
}

/// Format microseconds as RFC 3339 with only as many fractional digits as needed.
pub fn format_time_index(micros: i64, offset: Option<FixedOffset>) -> Option<String> {
    from_unix_micros(micros, offset).map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}
