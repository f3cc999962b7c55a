//! The fixed list of UTC calendar days a balance history covers.
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use thiserror::Error;

pub const DAYS_IN_WINDOW: usize = 32;

/// Today and yesterday. Their closing balance can still change so they are never cached.
pub const RECENT_DAY_COUNT: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowDay {
    pub date: NaiveDate,
    pub is_recent: bool,
}

impl WindowDay {
    /// The last millisecond of the day, 23:59:59.999 UTC.
    pub fn end_of_day(&self) -> DateTime<Utc> {
        let last_moment = self
            .date
            .and_hms_milli_opt(23, 59, 59, 999)
            .expect("23:59:59.999 to be a valid time of day");
        Utc.from_utc_datetime(&last_moment)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DayWindowError {
    #[error("a day window needs at least {RECENT_DAY_COUNT} days, got {0}")]
    TooShort(usize),
}

/// Consecutive days, oldest first, ending on and including today.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayWindow {
    days: Vec<WindowDay>,
}

impl DayWindow {
    pub fn ending_on(today: NaiveDate, day_count: usize) -> Result<Self, DayWindowError> {
        if day_count < RECENT_DAY_COUNT {
            return Err(DayWindowError::TooShort(day_count));
        }

        let days = (0..day_count)
            .rev()
            .map(|days_ago| WindowDay {
                date: today - Duration::days(days_ago as i64),
                is_recent: days_ago < RECENT_DAY_COUNT,
            })
            .collect();

        Ok(Self { days })
    }

    /// The default window for the UTC calendar day `now` falls on. Take `now` once per run so
    /// every address sees the same days.
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self::ending_on(now.date_naive(), DAYS_IN_WINDOW)
            .expect("default window to be longer than the recent days")
    }

    pub fn days(&self) -> &[WindowDay] {
        &self.days
    }

    pub fn first_day(&self) -> NaiveDate {
        self.days[0].date
    }

    /// The oldest day that must never be cached.
    pub fn first_recent_day(&self) -> NaiveDate {
        self.days[self.days.len() - RECENT_DAY_COUNT].date
    }

    pub fn today(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }
}
