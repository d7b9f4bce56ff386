//! Download window for price data.

use crate::error::{DataError, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl Default for DateRange {
    /// 2022-01-01 through 2024-12-31.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// First day of the range
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Midnight UTC at the start of the range.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC after the last day, so the end date itself is covered.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    /// Number of Monday-to-Friday days in the range.
    pub fn weekdays(&self) -> usize {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count()
    }
}
