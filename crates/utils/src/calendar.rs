//! Calendar-day arithmetic for the rollover and activity logic.
//!
//! A "day key" is a plain [`NaiveDate`] in an explicit frame (the caller's
//! local offset, or UTC). All "is it a new day" decisions compare day keys,
//! never elapsed durations, so clock jumps and DST transitions cannot
//! double- or skip-fire.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Calendar day of `instant` in the frame of `offset`.
pub fn local_day(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Calendar day of `instant` in the UTC frame.
pub fn utc_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Day offset from `today` to `due`, by calendar-day subtraction rather than
/// instant subtraction, so a date stored as midnight-UTC is never off by one.
/// A task without a due date sorts after everything else.
pub fn days_until(today: NaiveDate, due: Option<NaiveDate>) -> i64 {
    match due {
        Some(date) => (date - today).num_days(),
        None => i64::MAX,
    }
}

/// Parse a user-configured reset boundary in `HH:MM` form.
pub fn parse_reset_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// Delay from `now` until the next occurrence of `reset` on the same wall
/// clock: today's `reset` if still ahead, otherwise tomorrow's.
pub fn delay_until(now: DateTime<FixedOffset>, reset: NaiveTime) -> Duration {
    let now_naive = now.naive_local();
    let today_at = now_naive.date().and_time(reset);
    if today_at > now_naive {
        today_at - now_naive
    } else {
        today_at + Duration::days(1) - now_naive
    }
}
