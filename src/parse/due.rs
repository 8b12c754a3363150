use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;

static RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+(\d{1,4})([dw])$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized due date '{0}' (expected YYYY-MM-DD, today, tomorrow, +Nd, +Nw, or none)")]
pub struct DueParseError(pub String);

/// Parse a due date relative to `now`.
///
/// Calendar dates resolve to the last millisecond of that day in `now`'s
/// time zone, so a task due today is not overdue until the day is over.
/// `none`, `clear` and the empty string mean "no due date".
pub fn parse_due<Tz: TimeZone>(
    input: &str,
    now: DateTime<Tz>,
) -> Result<Option<DateTime<Utc>>, DueParseError> {
    let s = input.trim().to_ascii_lowercase();
    let today = now.date_naive();
    let date = match s.as_str() {
        "" | "none" | "clear" => return Ok(None),
        "today" => today,
        "tomorrow" => today + Duration::days(1),
        _ => {
            if let Some(caps) = RELATIVE.captures(&s) {
                let n: i64 = caps[1].parse().map_err(|_| DueParseError(input.to_string()))?;
                let days = if &caps[2] == "w" { n * 7 } else { n };
                today + Duration::days(days)
            } else if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                date
            } else if let Ok(at) = DateTime::parse_from_rfc3339(input.trim()) {
                return Ok(Some(at.with_timezone(&Utc)));
            } else {
                return Err(DueParseError(input.to_string()));
            }
        }
    };
    Ok(Some(end_of_day(date, &now.timezone())))
}

/// First instant of `date` in `tz`. Days are 23 or 25 hours long across
/// DST changes, so day bounds are always taken from local midnights.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Last millisecond of `date` in `tz`
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    start_of_day(date + Duration::days(1), tz) - Duration::milliseconds(1)
}
