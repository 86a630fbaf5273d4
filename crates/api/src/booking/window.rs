use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Wire format for every date exchanged with clients.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` date.
///
/// chrono alone accepts unpadded fields such as `2025-7-1`, so the shape is
/// checked before parsing.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(ValidationError::MalformedDate);
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValidationError::MalformedDate)
}

/// A rental period `[start, end)`. The end date is the return day and is not
/// occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse both ends of a window. Only the format is checked; an inverted
    /// window is returned as-is and overlaps nothing.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(parse_date(start)?, parse_date(end)?))
    }

    /// Whole days between start and end. Negative for inverted windows.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Half-open overlap test. This is the only definition of "conflict" in
    /// the crate.
    pub fn overlaps(&self, other: &DateWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}
