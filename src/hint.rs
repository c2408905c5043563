use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;

/// Headers consulted for a server-suggested retry delay, in priority order.
/// The first one that parses wins; later entries are not looked at.
pub const RETRY_HINT_HEADERS: [&str; 2] = ["retry-after", "ratelimit-reset"];

/// Reads a server-suggested retry delay from response headers.
pub fn read_retry_hint(headers: &HeaderMap) -> Option<Duration> {
    read_retry_hint_at(headers, Utc::now())
}

/// Same as [`read_retry_hint`] with an explicit clock.
///
/// Numeric values are seconds. Anything else is parsed as a date in one of
/// the HTTP-date forms (IMF-fixdate, RFC 850, asctime) or RFC 3339 and
/// converted to the time remaining from `now`; dates in the past yield zero.
/// Headers that fail to parse are skipped.
pub fn read_retry_hint_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    RETRY_HINT_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_hint(value.trim(), now))
    })
}

fn parse_hint(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    if value.is_empty() {
        return None;
    }
    if value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        let seconds: f64 = value.parse().ok()?;
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let at = parse_http_date(value)?;
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Obsolete HTTP-date forms, always in GMT.
const LEGACY_HTTP_DATE_FORMATS: [&str; 2] = [
    // RFC 850: Sunday, 06-Nov-94 08:49:37 GMT
    "%A, %d-%b-%y %H:%M:%S GMT",
    // asctime: Sun Nov  6 08:49:37 1994
    "%a %b %e %H:%M:%S %Y",
];

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    LEGACY_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|at| at.with_timezone(&Utc))
        })
}
