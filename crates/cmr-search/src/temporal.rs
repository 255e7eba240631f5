//! Temporal range parsing and serialization.
//!
//! CMR temporal filters are comma-separated pairs of UTC instants in
//! `YYYY-MM-DDTHH:MM:SSZ` form, with either side allowed to be empty for
//! an open-ended range. Inputs may be structured chrono values or strings
//! at year, month, day, or full timestamp granularity; components a string
//! omits default to the start of the period for a lower bound and the end
//! of the period for an upper bound.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{CmrError, CmrResult};

const ISO_8601: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A temporal bound accepted by [`temporal`](crate::GranuleQuery::temporal).
#[derive(Debug, Clone, PartialEq)]
pub enum DateLike {
    /// A string at year, month, day, or timestamp granularity.
    Iso(String),
    /// A calendar date; the time of day is filled per bound.
    Date(NaiveDate),
    /// A naive timestamp, assumed to be UTC.
    Naive(NaiveDateTime),
    /// An absolute instant.
    Instant(DateTime<Utc>),
}

impl From<&str> for DateLike {
    fn from(value: &str) -> Self {
        DateLike::Iso(value.to_string())
    }
}

impl From<String> for DateLike {
    fn from(value: String) -> Self {
        DateLike::Iso(value)
    }
}

impl From<NaiveDate> for DateLike {
    fn from(value: NaiveDate) -> Self {
        DateLike::Date(value)
    }
}

impl From<NaiveDateTime> for DateLike {
    fn from(value: NaiveDateTime) -> Self {
        DateLike::Naive(value)
    }
}

impl From<DateTime<Utc>> for DateLike {
    fn from(value: DateTime<Utc>) -> Self {
        DateLike::Instant(value)
    }
}

/// Which side of a range a bound sits on, which decides how missing
/// components are defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Lower,
    Upper,
}

/// Resolve an optional bound to an ISO 8601 string, or `""` when absent.
pub(crate) fn resolve_bound(value: Option<DateLike>, bound: Bound) -> CmrResult<String> {
    let value = match value {
        Some(value) => value,
        None => return Ok(String::new()),
    };

    let instant = match value {
        DateLike::Iso(s) => parse_granular(&s, bound)?,
        DateLike::Date(date) => Utc.from_utc_datetime(&date.and_time(default_time(bound))),
        DateLike::Naive(dt) => Utc.from_utc_datetime(&dt),
        DateLike::Instant(dt) => dt,
    };

    Ok(instant.format(ISO_8601).to_string())
}

/// Build the serialized `from,to` pair, rejecting inverted ranges.
pub(crate) fn encode_range(
    date_from: Option<DateLike>,
    date_to: Option<DateLike>,
) -> CmrResult<String> {
    let from = resolve_bound(date_from, Bound::Lower)?;
    let to = resolve_bound(date_to, Bound::Upper)?;

    // ISO 8601 strings at this precision order lexicographically.
    if !from.is_empty() && !to.is_empty() && from > to {
        return Err(CmrError::invalid(
            "temporal",
            "date_from must be earlier than date_to",
        ));
    }

    Ok(format!("{},{}", from, to))
}

fn default_time(bound: Bound) -> NaiveTime {
    match bound {
        Bound::Lower => NaiveTime::MIN,
        // NaiveTime::from_hms_opt(23, 59, 59) is always valid.
        Bound::Upper => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    }
}

/// Parse a string bound at whatever granularity it carries.
fn parse_granular(input: &str, bound: Bound) -> CmrResult<DateTime<Utc>> {
    let input = input.trim();

    // Full timestamp with offset ("2016-10-12T10:55:07Z", "...+02:00").
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Naive timestamps are taken as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    // Day granularity: fill the time of day.
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(default_time(bound))));
    }

    // Month granularity: fill the day and time of day.
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d") {
        let date = match bound {
            Bound::Lower => date,
            Bound::Upper => last_day_of_month(date),
        };
        return Ok(Utc.from_utc_datetime(&date.and_time(default_time(bound))));
    }

    // Year granularity: fill everything.
    if input.len() == 4 {
        if let Ok(year) = input.parse::<i32>() {
            let date = match bound {
                Bound::Lower => NaiveDate::from_ymd_opt(year, 1, 1),
                Bound::Upper => NaiveDate::from_ymd_opt(year, 12, 31),
            };
            if let Some(date) = date {
                return Ok(Utc.from_utc_datetime(&date.and_time(default_time(bound))));
            }
        }
    }

    Err(CmrError::invalid(
        "temporal",
        format!("'{}' is not an ISO 8601 date or timestamp", input),
    ))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;

    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}
