//! Workday calendar arithmetic.
//!
//! All schedule date math runs over a fixed set of loaded calendar days:
//! durations count workdays only, and date walks skip weekends and holidays
//! as flagged by the loaded data. The calendar is pure reference data; it is
//! built once per computation from the record store's `calendar_days` rows.
//!
//! Walking outside the loaded horizon is a hard error
//! ([`CalendarError::HorizonExceeded`]), not a silent truncation. Callers
//! must load a horizon that safely brackets every date a cascade can reach.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::api::CalendarDay;

/// Result type for calendar walks.
pub type CalendarResult<T> = Result<T, CalendarError>;

/// Error type for calendar arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// A date walk left the loaded calendar horizon. Treated as a
    /// configuration/programmer error: the caller loaded too narrow a range.
    #[error("Calendar horizon exceeded at {date}; load a wider range")]
    HorizonExceeded { date: NaiveDate },
}

/// Pure date arithmetic over a fixed set of workdays.
#[derive(Debug, Clone)]
pub struct WorkdayCalendar {
    workdays: BTreeSet<NaiveDate>,
    /// Min/max of all loaded days (workdays and non-workdays alike).
    horizon: Option<(NaiveDate, NaiveDate)>,
}

impl WorkdayCalendar {
    /// Build a calendar from loaded calendar-day rows.
    pub fn new(days: &[CalendarDay]) -> Self {
        let workdays: BTreeSet<NaiveDate> = days
            .iter()
            .filter(|d| d.is_workday)
            .map(|d| d.date)
            .collect();

        let horizon = match (
            days.iter().map(|d| d.date).min(),
            days.iter().map(|d| d.date).max(),
        ) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        };

        Self { workdays, horizon }
    }

    /// Whether the given date is flagged as a workday.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        self.workdays.contains(&date)
    }

    /// Add `n` workdays to a date. Positive walks forward, negative walks
    /// backward; the starting date itself is never counted. `n = 0` returns
    /// the date unchanged.
    pub fn add_workdays(&self, from: NaiveDate, n: i64) -> CalendarResult<NaiveDate> {
        if n == 0 {
            return Ok(from);
        }

        let forward = n > 0;
        let mut remaining = n.unsigned_abs();
        let mut current = from;

        while remaining > 0 {
            current = self.adjacent_day(current, forward)?;
            if self.workdays.contains(&current) {
                remaining -= 1;
            }
        }
        Ok(current)
    }

    /// End date for a start date plus a workday duration.
    ///
    /// Duration counts the start day as day 1: a duration of 1 ends on the
    /// start date, a duration of N ends (N - 1) workdays later.
    pub fn calc_end_date(&self, start: NaiveDate, duration: i64) -> CalendarResult<NaiveDate> {
        if duration <= 1 {
            return Ok(start);
        }
        self.add_workdays(start, duration - 1)
    }

    /// Workday duration between two dates, inclusive on both ends.
    ///
    /// Floored at 1 even when the range contains no workdays, so stored
    /// durations never drop below a single day.
    pub fn calc_duration(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 1;
        }
        let count = self.workdays.range(start..=end).count() as i64;
        count.max(1)
    }

    /// The date itself when it is a workday, otherwise the next workday
    /// strictly after it.
    pub fn next_workday(&self, date: NaiveDate) -> CalendarResult<NaiveDate> {
        let mut current = date;
        while !self.workdays.contains(&current) {
            current = self.adjacent_day(current, true)?;
        }
        Ok(current)
    }

    fn adjacent_day(&self, date: NaiveDate, forward: bool) -> CalendarResult<NaiveDate> {
        let next = if forward {
            date.succ_opt()
        } else {
            date.pred_opt()
        };
        let next = next.ok_or(CalendarError::HorizonExceeded { date })?;

        match self.horizon {
            Some((min, max)) if min <= next && next <= max => Ok(next),
            _ => Err(CalendarError::HorizonExceeded { date: next }),
        }
    }
}
