//! Calendar keys and date helpers.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Year-month key used for aggregate and sync bookkeeping (wire form `YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Create a month key; `month` must be 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month key of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Whether a date falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        let year: i32 = y.parse().map_err(|_| format!("Invalid year: {}", y))?;
        let month: u32 = m.parse().map_err(|_| format!("Invalid month: {}", m))?;
        Self::new(year, month).ok_or_else(|| format!("Month out of range: {}", m))
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Parse a wire date key (`YYYY-MM-DD`).
pub fn parse_date_key(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Format a date as a wire date key (`YYYY-MM-DD`).
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True for Saturday and Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Working days in an inclusive date range, weekends skipped.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        if !is_weekend(current) {
            days.push(current);
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_roundtrip() {
        let key: MonthKey = "2026-03".parse().unwrap();
        assert_eq!(key.year(), 2026);
        assert_eq!(key.month(), 3);
        assert_eq!(key.to_string(), "2026-03");
    }

    #[test]
    fn test_month_key_rejects_bad_month() {
        assert!("2026-13".parse::<MonthKey>().is_err());
        assert!("2026".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_contains() {
        let key = MonthKey::new(2026, 4).unwrap();
        assert!(key.contains(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
        assert!(!key.contains(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
    }

    #[test]
    fn test_working_days_skips_weekend() {
        // 2026-03-07 is a Saturday
        let sat = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let mon = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let days = working_days(sat, mon);
        assert_eq!(days, vec![mon]);
    }

    #[test]
    fn test_date_key_parse() {
        let date = parse_date_key("2026-03-05").unwrap();
        assert_eq!(format_date_key(date), "2026-03-05");
        assert!(parse_date_key("not-a-date").is_none());
    }
}
