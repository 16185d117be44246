//! Date-range parsing and validation for a check request.
//!
//! The backend enforces the same rules; running them here first means a bad
//! range never produces a network request.

use chrono::NaiveDate;
use thiserror::Error;

/// Widest allowed window, in days between start and end (inclusive 3-day span).
pub const MAX_WINDOW_DAYS: i64 = 2;

/// Wire date format, ISO-8601 calendar dates.
pub const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start_date is required")]
    MissingStart,
    #[error("dates must be YYYY-MM-DD")]
    BadFormat,
    #[error("end_date must be same or after start_date")]
    EndBeforeStart,
    #[error("Maximum allowed window is 3 days")]
    WindowTooWide,
}

/// A validated inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse and validate; `end` falls back to `start` when empty or absent.
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self, ValidationError> {
        if start.trim().is_empty() {
            return Err(ValidationError::MissingStart);
        }
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FMT)
            .map_err(|_| ValidationError::BadFormat)?;
        let end = match end.map(str::trim).filter(|s| !s.is_empty()) {
            Some(e) => {
                NaiveDate::parse_from_str(e, DATE_FMT).map_err(|_| ValidationError::BadFormat)?
            }
            None => start,
        };
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart);
        }
        if (self.end - self.start).num_days() > MAX_WINDOW_DAYS {
            return Err(ValidationError::WindowTooWide);
        }
        Ok(())
    }

    /// Every date in the inclusive window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let mut cur = Some(self.start);
        let end = self.end;
        std::iter::from_fn(move || {
            let d = cur?;
            if d > end {
                return None;
            }
            cur = d.succ_opt();
            Some(d)
        })
    }

    pub fn start_string(&self) -> String {
        self.start.format(DATE_FMT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(DATE_FMT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_defaults_to_start() {
        let r = DateRange::parse("2024-03-01", None).unwrap();
        assert_eq!(r.start, r.end);
        let r2 = DateRange::parse("2024-03-01", Some("")).unwrap();
        assert_eq!(r, r2);
    }

    #[test]
    fn rejects_end_before_start() {
        assert_eq!(
            DateRange::parse("2024-03-02", Some("2024-03-01")),
            Err(ValidationError::EndBeforeStart)
        );
    }

    #[test]
    fn rejects_window_wider_than_three_days() {
        // 3-day inclusive window is the max: 01..03 ok, 01..04 rejected.
        assert!(DateRange::parse("2024-03-01", Some("2024-03-03")).is_ok());
        assert_eq!(
            DateRange::parse("2024-03-01", Some("2024-03-04")),
            Err(ValidationError::WindowTooWide)
        );
    }

    #[test]
    fn rejects_garbage_and_missing_start() {
        assert_eq!(
            DateRange::parse("", Some("2024-03-01")),
            Err(ValidationError::MissingStart)
        );
        assert_eq!(
            DateRange::parse("03/01/2024", None),
            Err(ValidationError::BadFormat)
        );
    }

    #[test]
    fn days_walks_the_inclusive_window() {
        let r = DateRange::parse("2024-02-28", Some("2024-03-01")).unwrap();
        let days: Vec<String> = r.days().map(|d| d.format(DATE_FMT).to_string()).collect();
        // 2024 is a leap year.
        assert_eq!(days, vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
    }
}
