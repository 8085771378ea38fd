use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse date '{0}': {1}")]
    Date(String, String),
    #[error("Failed to parse time '{0}': expected HH:MM")]
    Time(String),
    #[error("Unknown weekday '{0}'")]
    Weekday(String),
}

/// Parses an English date expression ("tomorrow", "friday", "2024-03-05")
/// relative to `today`.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    // Only the calendar date matters; UTC carries it without DST gaps.
    let base = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
    parse_date_string(&input.trim().to_lowercase(), base, Dialect::Us)
        .map(|parsed| parsed.date_naive())
        .map_err(|e| ParseError::Date(input.to_string(), e.to_string()))
}

pub fn parse_time(input: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ParseError::Time(input.to_string()))
}

/// Weekday name, abbreviation or ordinal to the 0 (Sunday) - 6 (Saturday)
/// ordinal used by rules.
pub fn parse_weekday(input: &str) -> Result<i64, ParseError> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        // Range is checked by rule validation.
        return Ok(n);
    }
    trimmed
        .parse::<Weekday>()
        .map(|day| i64::from(day.num_days_from_sunday()))
        .map_err(|_| ParseError::Weekday(input.to_string()))
}

/// Comma-separated weekdays, e.g. `mon,wed,fri`.
pub fn parse_weekday_list(input: &str) -> Result<Vec<i64>, ParseError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_weekday)
        .collect()
}
