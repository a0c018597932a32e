//! Where message iteration starts and in which direction.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Default number of messages for [`FetchMode::Latest`].
pub const DEFAULT_LATEST_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Whole history, oldest first.
    Earliest,
    /// Messages at or after the timestamp, oldest first.
    FromDate(DateTime<Utc>),
    /// Messages with an id greater than the given one, oldest first.
    FromMessageId(i64),
    /// The newest N messages, newest first.
    Latest(usize),
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Latest(DEFAULT_LATEST_LIMIT)
    }
}

impl FetchMode {
    /// Whether messages are yielded oldest first.
    pub fn is_ascending(&self) -> bool {
        !matches!(self, FetchMode::Latest(_))
    }
}

/// Parses a start date: `YYYY-MM-DD` (midnight UTC), `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` (UTC) or RFC 3339 with offset or `Z`.
pub fn parse_start_date(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}
