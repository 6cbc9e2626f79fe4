//! Calendar month keys.
//!
//! A `MonthKey` identifies one calendar month and is always backed by the first
//! day of that month, so time-bucketing never depends on how a store formats
//! its timestamps.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{DomainError, DomainResult};

/// A (year, month) pair, ordered chronologically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| DomainError::validation(format!("invalid calendar month {year}-{month}")))
    }

    /// The month containing `at`, in the timezone `at` carries.
    pub fn containing<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let date = at.date_naive();
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn previous(&self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }

    pub fn next(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    /// Inclusive start of the month (midnight UTC on the first day).
    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// Exclusive end of the month: the start of the following month.
    ///
    /// `None` only for the last month chrono can represent.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.next().map(|m| m.start())
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        Self::containing(at) == *self
    }

    /// Short display label, e.g. `Jan 2006`.
    pub fn label(&self) -> String {
        self.0.format("%b %Y").to_string()
    }

    /// `count` consecutive months ending at (and including) `self`, oldest first.
    pub fn trailing(self, count: usize) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(count);
        let mut cursor = Some(self);
        while months.len() < count {
            match cursor {
                Some(m) => {
                    months.push(m);
                    cursor = m.previous();
                }
                None => break,
            }
        }
        months.reverse();
        months
    }
}

impl core::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
