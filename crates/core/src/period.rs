//! The PKUP reporting period.
//!
//! A period runs from the 19th of the previous month at midnight through the
//! 18th of the current month at 23:59:59, both in local time.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use crate::errors::PkupError;

#[cfg(test)]
#[path = "period_tests.rs"]
mod tests;

/// Date format used on the command line and in reports, e.g. `18.02.2024`.
pub const PERIOD_FORMAT: &str = "%d.%m.%Y";

const PERIOD_END_DAY: u32 = 18;
const PERIOD_START_DAY: u32 = 19;

/// Converts a local wall-clock time to UTC.
///
/// Ambiguous times pick the earlier instant. Times that do not exist (inside
/// a DST gap) are read as if the offset were the one in force at the same
/// UTC wall-clock time.
fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(t) => t.with_timezone(&Utc),
        None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            naive.and_utc() - chrono::Duration::seconds(i64::from(offset.local_minus_utc()))
        }
    }
}

/// The period ending on the 18th of the month of `now`, in UTC.
pub fn current_period<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = now.timezone();
    let (year, month) = (now.year(), now.month());
    let (prev_year, prev_month) = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };

    let start = NaiveDate::from_ymd_opt(prev_year, prev_month, PERIOD_START_DAY)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN);
    let end = NaiveDate::from_ymd_opt(year, month, PERIOD_END_DAY)
        .unwrap_or(NaiveDate::MIN)
        .and_time(end_of_day_time());

    (local_to_utc(&tz, start), local_to_utc(&tz, end))
}

fn end_of_day_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Parses a `dd.mm.yyyy` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, PkupError> {
    NaiveDate::parse_from_str(value.trim(), PERIOD_FORMAT).map_err(|e| {
        PkupError::Config(format!(
            "'{}' is not a dd.mm.yyyy date: {}",
            value, e
        ))
    })
}

/// Midnight at the start of `date` in `tz`, in UTC.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}

/// The last second of `date` in `tz`, in UTC.
pub fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(end_of_day_time()))
}
