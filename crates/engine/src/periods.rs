//! Month keys and the gap-free month timeline used to seed chart series.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{EngineError, dates::parse_date};

/// A calendar month, displayed as `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Builds a key, returning `None` when `month` is outside `1..=12`.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// The following month.
    #[must_use]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = EngineError;

    /// Accepts `YYYY-MM` or any date the row normaliser understands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((year, month)) = trimmed.split_once('-')
            && year.len() == 4
            && month.len() == 2
            && let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>())
            && let Some(key) = MonthKey::new(year, month)
        {
            return Ok(key);
        }

        parse_date(trimmed)
            .map(MonthKey::of)
            .ok_or_else(|| EngineError::InvalidDate(format!("invalid month: {trimmed}")))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered, gap-free month keys from the month of `start` through the month
/// of `end`, both inclusive.
///
/// Returns an empty list when `end` falls in a month before `start`.
#[must_use]
pub fn build_periods(start: NaiveDate, end: NaiveDate) -> Vec<MonthKey> {
    let first = MonthKey::of(start);
    let last = MonthKey::of(end);

    let mut periods = Vec::new();
    let mut current = first;
    while current <= last {
        periods.push(current);
        current = current.next();
    }
    periods
}

/// [`build_periods`] over raw date strings; unparseable input yields an
/// empty list.
#[must_use]
pub fn build_periods_str(start: &str, end: &str) -> Vec<MonthKey> {
    match (parse_date(start), parse_date(end)) {
        (Some(start), Some(end)) => build_periods(start, end),
        _ => Vec::new(),
    }
}
