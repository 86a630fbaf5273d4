use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::DateWindow;

/// The rule a requested window broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid date format. Use YYYY-MM-DD")]
    MalformedDate,
    #[error("Start date must be from tomorrow onwards")]
    PastOrTooSoonStart,
    #[error("Start date is too far in advance")]
    TooFarInAdvance,
    #[error("Rental period is too short")]
    DurationTooShort,
    #[error("Rental period is too long")]
    DurationTooLong,
}

impl ValidationError {
    /// Stable identifier returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedDate => "malformed_date",
            Self::PastOrTooSoonStart => "past_or_too_soon_start",
            Self::TooFarInAdvance => "too_far_in_advance",
            Self::DurationTooShort => "duration_too_short",
            Self::DurationTooLong => "duration_too_long",
        }
    }
}

/// Business rules for a rental window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRules {
    pub min_rental_days: i64,
    pub max_rental_days: i64,
    /// Latest start date, in days from today.
    pub max_advance_days: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            min_rental_days: 5,
            max_rental_days: 30,
            max_advance_days: 90,
        }
    }
}

impl BookingRules {
    /// Parse and validate a requested window against every rule.
    ///
    /// Rules are independent, so a window breaking exactly one rule always
    /// reports that rule.
    pub fn validate(
        &self,
        start_date: &str,
        end_date: &str,
        today: NaiveDate,
    ) -> Result<DateWindow, ValidationError> {
        let window = DateWindow::parse(start_date, end_date)?;
        self.validate_window(&window, today)?;
        Ok(window)
    }

    pub fn validate_window(
        &self,
        window: &DateWindow,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        let earliest = today
            .checked_add_days(Days::new(1))
            .ok_or(ValidationError::PastOrTooSoonStart)?;
        if window.start < earliest {
            return Err(ValidationError::PastOrTooSoonStart);
        }

        if (window.start - today).num_days() > self.max_advance_days {
            return Err(ValidationError::TooFarInAdvance);
        }

        self.check_duration(window)
    }

    /// Length rules only. Used when an administrator moves an existing booking.
    pub fn check_duration(&self, window: &DateWindow) -> Result<(), ValidationError> {
        let days = window.days();
        if days < self.min_rental_days {
            return Err(ValidationError::DurationTooShort);
        }
        if days > self.max_rental_days {
            return Err(ValidationError::DurationTooLong);
        }
        Ok(())
    }
}
