use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::booking::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "car_class", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CarClass {
    Economy,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fuel_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
    Lpg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transmission", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
    SemiAutomatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    /// Soft-deleted by an administrator.
    Deleted,
}

impl BookingStatus {
    /// Statuses that occupy the car for the booking's window.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "deposit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub class: CarClass,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub price_per_day: Decimal,
    pub deposit_amount: Decimal,
    pub features: Vec<String>,
    /// Administrative switch. Inactive cars are never offered for booking.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Car {
    pub fn quote(&self, window: &DateWindow) -> Decimal {
        self.price_per_day * Decimal::from(window.days())
    }
}

/// Car fields written by the admin endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct CarDraft {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub class: CarClass,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub price_per_day: Decimal,
    pub deposit_amount: Decimal,
    pub features: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub total_price: Decimal,
    pub deposit_amount: Decimal,
    pub deposit_status: DepositStatus,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    /// Human facing reference quoted in emails, e.g. `SOF1A2B3C4D`.
    pub fn reference(&self) -> String {
        let simple = self.id.simple().to_string();
        format!("SOF{}", simple[..8].to_uppercase())
    }

    /// Lowercase id prefix encoded in a reference, if `reference` is one.
    /// The `SOF` marker is optional and case is ignored.
    pub fn parse_reference(reference: &str) -> Option<String> {
        let reference = reference.trim();
        let hex = match reference.get(..3) {
            Some(marker) if marker.eq_ignore_ascii_case("SOF") => &reference[3..],
            _ => reference,
        };

        (hex.len() == 8 && hex.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| hex.to_ascii_lowercase())
    }

    pub fn client_name(&self) -> String {
        format!("{} {}", self.client_first_name, self.client_last_name)
    }
}

/// Customer contact details captured with a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    pub ip_address: Option<String>,
}

/// A booking ready to be inserted. Status and deposit status start as pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub car_id: Uuid,
    pub window: DateWindow,
    pub customer: CustomerInfo,
    pub total_price: Decimal,
    pub deposit_amount: Decimal,
}

/// Fields an administrator may change on an existing booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingChanges {
    pub status: Option<BookingStatus>,
    pub deposit_status: Option<DepositStatus>,
    pub notes: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.deposit_status.is_none() && self.notes.is_none()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.deposit_status.is_some() {
            fields.push("deposit_status");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub car_id: Option<Uuid>,
    /// Bookings starting on or after this date.
    pub start_date: Option<NaiveDate>,
    /// Bookings ending on or before this date.
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BookingStatistics {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    /// Sum of total_price over confirmed bookings.
    pub total_revenue: Decimal,
}
