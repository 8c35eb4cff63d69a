//! Shared helpers for calendar-day arithmetic.
//!
//! Days are UTC calendar days. A day covers `[00:00, next day 00:00)`.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};

/// First instant of `date`
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(NaiveTime::default()).and_utc()
}

/// Half-open `[start, end)` range covering `date`
pub fn day_range(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
  let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
  (day_start(date), day_start(next))
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
  let offset = date.weekday().num_days_from_monday() as u64;
  date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Half-open `[Monday 00:00, next Monday 00:00)` range of the week containing `date`
pub fn week_range(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
  let monday = week_start(date);
  let next = monday.checked_add_days(Days::new(7)).unwrap_or(monday);
  (day_start(monday), day_start(next))
}
