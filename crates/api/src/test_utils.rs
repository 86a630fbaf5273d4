//! Shared test utilities.
//!
//! Provides mock factories, in-memory repositories and a flexible
//! `TestStateBuilder` for constructing `AppState` instances with only the
//! mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_car};
//!
//! let mut car_repo = MockCarRepo::new();
//! car_repo.expect_find_active().returning(|_| Ok(Some(mock_car())));
//!
//! let state = TestStateBuilder::new()
//!     .with_car_repo(car_repo)
//!     .build();
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::booking::DateWindow;
use crate::config::Config;
use crate::models::{
    Booking, BookingChanges, BookingFilter, BookingStatistics, BookingStatus, Car, CarClass,
    CarDraft, CustomerInfo, DepositStatus, FuelType, NewBooking, Transmission,
};
use crate::repos::{
    BookingRepo, CarFilter, CarRepo, MockBookingRepo, MockCarRepo, MockStatusRepo, Repos,
    StatusRepo, WriteError,
};
use crate::services::{BookingNotifier, EmailSender, MockBookingNotifier};
use crate::state::AppState;
use crate::stores::{MemoryRateLimitStore, RateLimitStore, RateLimiter, Stores};

pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: None,
        smtp_url: None,
        resend_api_key: None,
        mail_from: "SofCar <noreply@sof-car.eu>".to_string(),
        admin_email: "office@sof-car.eu".to_string(),
        admin_api_key: TEST_ADMIN_KEY.to_string(),
        env: "test".to_string(),
        sentry_dsn: None,
        cors_origins: vec![],
        trust_forwarded_for: true,
        rate_limit_window_secs: 3600,
        rate_limit_max_requests: 100,
        min_rental_days: 5,
        max_rental_days: 30,
        max_advance_days: 90,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates an active standard-class car at 45.00 per day.
pub fn mock_car() -> Car {
    Car {
        id: Uuid::new_v4(),
        brand: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: 2022,
        class: CarClass::Standard,
        fuel_type: Some(FuelType::Hybrid),
        transmission: Some(Transmission::Automatic),
        price_per_day: Decimal::new(4500, 2),
        deposit_amount: Decimal::new(30000, 2),
        features: vec!["air conditioning".to_string(), "bluetooth".to_string()],
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn mock_customer() -> CustomerInfo {
    CustomerInfo {
        first_name: "Maria".to_string(),
        last_name: "Ivanova".to_string(),
        email: "maria@example.com".to_string(),
        phone: "+359881234567".to_string(),
        notes: None,
        ip_address: Some("203.0.113.7".to_string()),
    }
}

/// Creates a pending booking for the given car and window.
pub fn mock_booking(car_id: Uuid, start: NaiveDate, end: NaiveDate) -> Booking {
    let customer = mock_customer();
    Booking {
        id: Uuid::new_v4(),
        car_id,
        start_date: start,
        end_date: end,
        client_first_name: customer.first_name,
        client_last_name: customer.last_name,
        client_email: customer.email,
        client_phone: customer.phone,
        total_price: Decimal::new(4500, 2) * Decimal::from((end - start).num_days()),
        deposit_amount: Decimal::new(30000, 2),
        deposit_status: DepositStatus::Pending,
        status: BookingStatus::Pending,
        notes: None,
        ip_address: customer.ip_address,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Notifier mock that accepts any number of events.
pub fn silent_notifier() -> MockBookingNotifier {
    let mut notifier = MockBookingNotifier::new();
    notifier.expect_notify().return_const(());
    notifier
}

/// In-memory car repository.
#[derive(Default)]
pub struct InMemoryCarRepo {
    cars: Mutex<Vec<Car>>,
}

impl InMemoryCarRepo {
    pub fn with_cars(cars: Vec<Car>) -> Self {
        Self {
            cars: Mutex::new(cars),
        }
    }
}

#[async_trait]
impl CarRepo for InMemoryCarRepo {
    async fn list(&self, filter: CarFilter) -> Result<Vec<Car>> {
        let cars = self.cars.lock().unwrap();
        Ok(cars
            .iter()
            .filter(|c| filter.include_inactive || c.is_active)
            .filter(|c| filter.class.is_none_or(|class| c.class == class))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Car>> {
        let cars = self.cars.lock().unwrap();
        Ok(cars.iter().find(|c| c.id == id).cloned())
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<Car>> {
        let cars = self.cars.lock().unwrap();
        Ok(cars.iter().find(|c| c.id == id && c.is_active).cloned())
    }

    async fn create(&self, draft: CarDraft) -> Result<Car> {
        let car = Car {
            id: Uuid::new_v4(),
            brand: draft.brand,
            model: draft.model,
            year: draft.year,
            class: draft.class,
            fuel_type: draft.fuel_type,
            transmission: draft.transmission,
            price_per_day: draft.price_per_day,
            deposit_amount: draft.deposit_amount,
            features: draft.features,
            is_active: draft.is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.cars.lock().unwrap().push(car.clone());
        Ok(car)
    }

    async fn update(&self, id: Uuid, draft: CarDraft) -> Result<Option<Car>> {
        let mut cars = self.cars.lock().unwrap();
        let Some(car) = cars.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        car.brand = draft.brand;
        car.model = draft.model;
        car.year = draft.year;
        car.class = draft.class;
        car.fuel_type = draft.fuel_type;
        car.transmission = draft.transmission;
        car.price_per_day = draft.price_per_day;
        car.deposit_amount = draft.deposit_amount;
        car.features = draft.features;
        car.is_active = draft.is_active;
        car.updated_at = Utc::now();
        Ok(Some(car.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut cars = self.cars.lock().unwrap();
        let before = cars.len();
        cars.retain(|c| c.id != id);
        Ok(cars.len() < before)
    }
}

/// In-memory booking repository.
///
/// Writes hold the lock across the overlap check and the mutation, mirroring
/// the exclusion constraint in PostgreSQL.
#[derive(Default)]
pub struct InMemoryBookingRepo {
    bookings: Mutex<Vec<Booking>>,
}

impl InMemoryBookingRepo {
    /// Insert a booking as-is, bypassing the overlap check.
    pub fn seed(&self, booking: Booking) -> Booking {
        self.bookings.lock().unwrap().push(booking.clone());
        booking
    }

    pub fn all(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }
}

fn overlaps_active(
    bookings: &[Booking],
    car_id: Uuid,
    window: &DateWindow,
    excluding: Option<Uuid>,
) -> bool {
    bookings.iter().any(|b| {
        b.car_id == car_id
            && b.status.is_active()
            && Some(b.id) != excluding
            && b.window().overlaps(window)
    })
}

fn matches_filter(booking: &Booking, filter: &BookingFilter) -> bool {
    filter.status.is_none_or(|s| booking.status == s)
        && filter.car_id.is_none_or(|id| booking.car_id == id)
        && filter.start_date.is_none_or(|d| booking.start_date >= d)
        && filter.end_date.is_none_or(|d| booking.end_date <= d)
}

#[async_trait]
impl BookingRepo for InMemoryBookingRepo {
    async fn list_active_by_car(&self, car_id: Uuid) -> Result<Vec<Booking>> {
        // Widen the window between the conflict check and the insert so
        // concurrent admissions actually interleave.
        tokio::time::sleep(Duration::from_millis(1)).await;

        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .filter(|b| b.car_id == car_id && b.status.is_active())
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_reference(&self, id_prefix: String) -> Result<Option<Booking>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Deleted)
            .filter(|b| b.id.simple().to_string().starts_with(&id_prefix))
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn insert(&self, new: NewBooking) -> Result<Booking, WriteError> {
        let mut bookings = self.bookings.lock().unwrap();
        if overlaps_active(&bookings, new.car_id, &new.window, None) {
            return Err(WriteError::Overlap);
        }

        let mut booking = mock_booking(new.car_id, new.window.start, new.window.end);
        booking.client_first_name = new.customer.first_name;
        booking.client_last_name = new.customer.last_name;
        booking.client_email = new.customer.email;
        booking.client_phone = new.customer.phone;
        booking.notes = new.customer.notes;
        booking.ip_address = new.customer.ip_address;
        booking.total_price = new.total_price;
        booking.deposit_amount = new.deposit_amount;

        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        window: DateWindow,
        total_price: Decimal,
    ) -> Result<Option<Booking>, WriteError> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(car_id) = bookings.iter().find(|b| b.id == id).map(|b| b.car_id) else {
            return Ok(None);
        };
        if overlaps_active(&bookings, car_id, &window, Some(id)) {
            return Err(WriteError::Overlap);
        }

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| anyhow::anyhow!("booking vanished"))?;
        booking.start_date = window.start;
        booking.end_date = window.end;
        booking.total_price = total_price;
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: BookingChanges,
    ) -> Result<Option<Booking>, WriteError> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(current) = bookings.iter().find(|b| b.id == id).cloned() else {
            return Ok(None);
        };
        if changes.status.is_some_and(BookingStatus::is_active)
            && overlaps_active(&bookings, current.car_id, &current.window(), Some(id))
        {
            return Err(WriteError::Overlap);
        }

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| anyhow::anyhow!("booking vanished"))?;
        if let Some(status) = changes.status {
            booking.status = status;
        }
        if let Some(deposit_status) = changes.deposit_status {
            booking.deposit_status = deposit_status;
        }
        if let Some(notes) = changes.notes {
            booking.notes = Some(notes);
        }
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        Ok(bookings.iter_mut().find(|b| b.id == id).map(|b| {
            b.status = BookingStatus::Deleted;
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn list(&self, filter: BookingFilter, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let bookings = self.bookings.lock().unwrap();
        let mut matching: Vec<_> = bookings
            .iter()
            .filter(|b| matches_filter(b, &filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset)?)
            .take(usize::try_from(limit)?)
            .collect())
    }

    async fn statistics(&self, filter: BookingFilter) -> Result<BookingStatistics> {
        let bookings = self.bookings.lock().unwrap();
        let mut stats = BookingStatistics::default();
        for booking in bookings.iter().filter(|b| matches_filter(b, &filter)) {
            stats.total += 1;
            match booking.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Confirmed => {
                    stats.confirmed += 1;
                    stats.total_revenue += booking.total_price;
                }
                BookingStatus::Cancelled => stats.cancelled += 1,
                BookingStatus::Completed | BookingStatus::Deleted => {}
            }
        }
        Ok(stats)
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo not explicitly set, an in-memory
/// rate limit store and a notifier that accepts every event.
pub struct TestStateBuilder {
    config: Config,
    car_repo: Option<Arc<dyn CarRepo>>,
    booking_repo: Option<Arc<dyn BookingRepo>>,
    status_repo: Option<MockStatusRepo>,
    rate_limit_store: Option<Arc<dyn RateLimitStore>>,
    notifier: Option<Arc<dyn BookingNotifier>>,
    email: Option<Arc<dyn EmailSender>>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            car_repo: None,
            booking_repo: None,
            status_repo: None,
            rate_limit_store: None,
            notifier: None,
            email: None,
        }
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn with_car_repo(mut self, repo: impl CarRepo + 'static) -> Self {
        self.car_repo = Some(Arc::new(repo));
        self
    }

    pub fn with_booking_repo(mut self, repo: impl BookingRepo + 'static) -> Self {
        self.booking_repo = Some(Arc::new(repo));
        self
    }

    /// Share a repository with the test body, e.g. to inspect it afterwards.
    pub fn with_shared_booking_repo(mut self, repo: Arc<dyn BookingRepo>) -> Self {
        self.booking_repo = Some(repo);
        self
    }

    pub fn with_status_repo(mut self, repo: MockStatusRepo) -> Self {
        self.status_repo = Some(repo);
        self
    }

    pub fn with_rate_limit_store(mut self, store: impl RateLimitStore + 'static) -> Self {
        self.rate_limit_store = Some(Arc::new(store));
        self
    }

    pub fn with_notifier(mut self, notifier: impl BookingNotifier + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn with_email_sender(mut self, sender: impl EmailSender + 'static) -> Self {
        self.email = Some(Arc::new(sender));
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            cars: self
                .car_repo
                .unwrap_or_else(|| Arc::new(MockCarRepo::new())),
            bookings: self
                .booking_repo
                .unwrap_or_else(|| Arc::new(MockBookingRepo::new())),
            status: Arc::new(self.status_repo.unwrap_or_else(MockStatusRepo::new))
                as Arc<dyn StatusRepo>,
        };

        let store = self
            .rate_limit_store
            .unwrap_or_else(|| Arc::new(MemoryRateLimitStore::new()));
        let stores = Stores {
            rate_limiter: RateLimiter::new(
                store,
                self.config
                    .rate_limit_policy()
                    .expect("test config has a non-zero rate limit window"),
            ),
        };

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(silent_notifier()));

        AppState::new(self.config, repos, stores, notifier, self.email)
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
