//! Request and response bodies for the HTTP API.

use garde::Validate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{CarQuote, DATE_FORMAT};
use crate::models::{
    Booking, BookingChanges, BookingStatistics, BookingStatus, Car, CarClass, CarDraft,
    CustomerInfo, DepositStatus, FuelType, Transmission,
};

const MAX_NOTES_LEN: usize = 1000;
const MAX_MESSAGE_LEN: usize = 5000;
/// Earliest model year accepted for a car.
const MIN_CAR_YEAR: i32 = 1900;

/// Public booking request.
///
/// The honeypot fields are hidden in the booking form. Browsers leave them
/// empty; naive bots fill them in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingPayload {
    #[garde(skip)]
    pub car_id: Uuid,
    /// Checked by the booking rules, not here.
    #[garde(skip)]
    pub start_date: String,
    #[garde(skip)]
    pub end_date: String,
    /// Latin or Cyrillic letters, spaces, hyphens and dots.
    #[garde(pattern(r"^[a-zA-Zа-яА-ЯёЁ \-\.]{2,50}$"))]
    pub client_first_name: String,
    #[garde(pattern(r"^[a-zA-Zа-яА-ЯёЁ \-\.]{2,50}$"))]
    pub client_last_name: String,
    #[garde(email, length(max = 254))]
    pub client_email: String,
    #[garde(custom(validate_phone))]
    pub client_phone: String,
    #[garde(length(max = MAX_NOTES_LEN))]
    #[serde(default)]
    pub notes: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub website: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub phone_number: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub company: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub subject: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub url: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub homepage: Option<String>,
}

impl CreateBookingPayload {
    /// Trim whitespace and lowercase the email before validation.
    pub fn normalized(mut self) -> Self {
        self.client_first_name = self.client_first_name.trim().to_string();
        self.client_last_name = self.client_last_name.trim().to_string();
        self.client_email = self.client_email.trim().to_lowercase();
        self.client_phone = self.client_phone.trim().to_string();
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }

    /// True if any honeypot field carries a value.
    pub fn is_spam(&self) -> bool {
        any_filled(&[
            &self.website,
            &self.phone_number,
            &self.company,
            &self.subject,
            &self.url,
            &self.homepage,
        ])
    }

    pub fn customer(&self, ip_address: Option<String>) -> CustomerInfo {
        CustomerInfo {
            first_name: self.client_first_name.clone(),
            last_name: self.client_last_name.clone(),
            email: self.client_email.clone(),
            phone: self.client_phone.clone(),
            notes: self.notes.clone(),
            ip_address,
        }
    }
}

fn any_filled(honeypots: &[&Option<String>]) -> bool {
    honeypots
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
}

/// Public contact form. Carries the same honeypots as the booking form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactPayload {
    #[garde(length(chars, min = 2, max = 100))]
    pub name: String,
    #[garde(email, length(max = 254))]
    pub email: String,
    #[garde(custom(validate_phone))]
    pub phone: String,
    #[garde(length(chars, min = 10, max = MAX_MESSAGE_LEN))]
    pub message: String,

    #[garde(skip)]
    #[serde(default)]
    pub website: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub phone_number: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub company: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub subject: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub url: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub homepage: Option<String>,
}

impl ContactPayload {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone = self.phone.trim().to_string();
        self.message = self.message.trim().to_string();
        self
    }

    pub fn is_spam(&self) -> bool {
        any_filled(&[
            &self.website,
            &self.phone_number,
            &self.company,
            &self.subject,
            &self.url,
            &self.homepage,
        ])
    }
}

fn validate_phone(value: &String, _: &()) -> garde::Result {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = value.chars().filter(char::is_ascii_digit).count();

    if !allowed || !(10..=15).contains(&digits) {
        return Err(garde::Error::new("must contain 10 to 15 digits"));
    }
    Ok(())
}

/// Admin car create/replace. Validated with the current year as context.
#[derive(Debug, Clone, Deserialize, Validate)]
#[garde(context(i32))]
pub struct CarPayload {
    #[garde(length(min = 1, max = 100))]
    pub brand: String,
    #[garde(length(min = 1, max = 100))]
    pub model: String,
    #[garde(custom(validate_year))]
    pub year: i32,
    #[garde(skip)]
    pub class: CarClass,
    #[garde(skip)]
    #[serde(default)]
    pub fuel_type: Option<FuelType>,
    #[garde(skip)]
    #[serde(default)]
    pub transmission: Option<Transmission>,
    #[garde(custom(validate_price))]
    pub price_per_day: Decimal,
    #[garde(custom(validate_deposit))]
    #[serde(default)]
    pub deposit_amount: Decimal,
    #[garde(length(max = 50), inner(length(min = 1, max = 100)))]
    #[serde(default)]
    pub features: Vec<String>,
    #[garde(skip)]
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CarPayload> for CarDraft {
    fn from(payload: CarPayload) -> Self {
        CarDraft {
            brand: payload.brand.trim().to_string(),
            model: payload.model.trim().to_string(),
            year: payload.year,
            class: payload.class,
            fuel_type: payload.fuel_type,
            transmission: payload.transmission,
            price_per_day: payload.price_per_day,
            deposit_amount: payload.deposit_amount,
            features: payload.features,
            is_active: payload.is_active,
        }
    }
}

fn default_true() -> bool {
    true
}

fn validate_year(value: &i32, current_year: &i32) -> garde::Result {
    let latest = current_year + 2;
    if *value < MIN_CAR_YEAR || *value > latest {
        return Err(garde::Error::new(format!(
            "must be between {MIN_CAR_YEAR} and {latest}"
        )));
    }
    Ok(())
}

fn validate_price(value: &Decimal, _: &i32) -> garde::Result {
    if *value <= Decimal::ZERO {
        return Err(garde::Error::new("must be greater than zero"));
    }
    Ok(())
}

fn validate_deposit(value: &Decimal, _: &i32) -> garde::Result {
    if *value < Decimal::ZERO {
        return Err(garde::Error::new("must not be negative"));
    }
    Ok(())
}

/// Admin booking update. Only these fields are editable.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateBookingPayload {
    #[garde(skip)]
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[garde(skip)]
    #[serde(default)]
    pub deposit_status: Option<DepositStatus>,
    #[garde(length(max = MAX_NOTES_LEN))]
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<UpdateBookingPayload> for BookingChanges {
    fn from(payload: UpdateBookingPayload) -> Self {
        BookingChanges {
            status: payload.status,
            deposit_status: payload.deposit_status,
            notes: payload.notes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleBookingPayload {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub class: Option<CarClass>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminBookingsQuery {
    pub status: Option<BookingStatus>,
    pub car_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CarsResponse {
    pub cars: Vec<Car>,
    pub total: usize,
}

impl From<Vec<Car>> for CarsResponse {
    fn from(cars: Vec<Car>) -> Self {
        Self {
            total: cars.len(),
            cars,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CarAvailabilityResponse {
    pub car: Car,
    pub start_date: String,
    pub end_date: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_days: Option<i64>,
}

impl From<CarQuote> for CarAvailabilityResponse {
    fn from(quote: CarQuote) -> Self {
        Self {
            start_date: quote.window.start.format(DATE_FORMAT).to_string(),
            end_date: quote.window.end.format(DATE_FORMAT).to_string(),
            car: quote.car,
            is_available: quote.is_available,
            total_price: quote.total_price,
            rental_days: quote.rental_days,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    pub message: &'static str,
    pub reference: String,
    pub booking: Booking,
}

/// What a customer sees when looking a booking up by reference. Contact
/// details and the client IP stay out of it.
#[derive(Debug, Serialize)]
pub struct BookingLookupResponse {
    pub reference: String,
    pub status: BookingStatus,
    pub deposit_status: DepositStatus,
    pub start_date: String,
    pub end_date: String,
    pub rental_days: i64,
    pub total_price: Decimal,
    pub deposit_amount: Decimal,
    pub client_first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car: Option<Car>,
}

impl BookingLookupResponse {
    pub fn new(booking: Booking, car: Option<Car>) -> Self {
        Self {
            reference: booking.reference(),
            status: booking.status,
            deposit_status: booking.deposit_status,
            start_date: booking.start_date.format(DATE_FORMAT).to_string(),
            end_date: booking.end_date.format(DATE_FORMAT).to_string(),
            rental_days: booking.window().days(),
            total_price: booking.total_price,
            deposit_amount: booking.deposit_amount,
            client_first_name: booking.client_first_name,
            car,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub returned: usize,
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<Booking>,
    pub pagination: Pagination,
    pub statistics: BookingStatistics,
}

#[derive(Debug, Serialize)]
pub struct BookingUpdatedResponse {
    pub booking: Booking,
    pub updated_fields: Vec<&'static str>,
}
