use crate::error::{AppError, Result};
use crate::utils::{format_date, parse_date};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "Start date {} must not be after end date {}",
                format_date(start),
                format_date(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two YYYY-MM-DD strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// `reference - days`; negative counts are treated as zero
    pub fn days_before(reference: NaiveDate, days: i64) -> Result<NaiveDate> {
        Duration::try_days(days.max(0))
            .and_then(|span| reference.checked_sub_signed(span))
            .ok_or_else(|| AppError::InvalidInput(format!("{} days before {} is out of range", days, reference)))
    }

    /// `(reference - days, reference)`
    pub fn last_days(reference: NaiveDate, days: i64) -> Result<Self> {
        Ok(Self {
            start: Self::days_before(reference, days)?,
            end: reference,
        })
    }

    /// Build from optional bounds, defaulting to `default_days` ending at `default_end`
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        default_end: NaiveDate,
        default_days: i64,
    ) -> Result<Self> {
        let end = end.unwrap_or(default_end);
        let start = match start {
            Some(start) => start,
            None => Self::days_before(end, default_days)?,
        };
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Every calendar date in the range
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days()).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", format_date(self.start), format_date(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_range() {
        assert!(DateRange::parse("2024-02-10", "2024-02-01").is_err());
        assert!(DateRange::parse("2024-02-01", "2024-02-01").is_ok());
    }

    #[test]
    fn test_contains_and_days() {
        let range = DateRange::parse("2024-02-01", "2024-02-03").unwrap();
        assert_eq!(range.days(), 3);
        assert!(range.contains(parse_date("2024-02-03").unwrap()));
        assert!(!range.contains(parse_date("2024-02-04").unwrap()));
        assert_eq!(range.iter_days().count(), 3);
        assert_eq!(range.to_string(), "2024-02-01 to 2024-02-03");
    }

    #[test]
    fn test_resolve_defaults() {
        let end = parse_date("2024-02-29").unwrap();
        let range = DateRange::resolve(None, None, end, 30).unwrap();
        assert_eq!(range.start, parse_date("2024-01-30").unwrap());
        assert_eq!(range.end, end);
    }

    #[test]
    fn test_last_days_out_of_range() {
        let end = parse_date("2024-03-31").unwrap();
        let range = DateRange::last_days(end, 10).unwrap();
        assert_eq!(range.start, parse_date("2024-03-21").unwrap());
        assert_eq!(DateRange::last_days(end, -5).unwrap().start, end);

        assert!(matches!(
            DateRange::last_days(end, 100_000_000_000),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            DateRange::last_days(end, i64::MAX),
            Err(AppError::InvalidInput(_))
        ));
    }
}
