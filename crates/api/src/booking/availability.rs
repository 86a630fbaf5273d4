use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{ConflictDetector, DateWindow, ValidationError};
use crate::models::{Car, CarClass};
use crate::repos::{BookingRepo, CarFilter, CarRepo};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Availability of one car for one window.
#[derive(Debug, Clone, Serialize)]
pub struct CarQuote {
    pub car: Car,
    pub window: DateWindow,
    pub is_available: bool,
    /// Only quoted when the car can actually be booked.
    pub total_price: Option<Decimal>,
    pub rental_days: Option<i64>,
}

/// Read-only view over cars and their active bookings.
pub struct AvailabilityService {
    cars: Arc<dyn CarRepo>,
    detector: ConflictDetector,
}

impl AvailabilityService {
    pub fn new(cars: Arc<dyn CarRepo>, bookings: Arc<dyn BookingRepo>) -> Self {
        Self {
            cars,
            detector: ConflictDetector::new(bookings),
        }
    }

    /// Active cars with no active booking overlapping the window.
    ///
    /// Only the date format is checked here. Browsing past or oversized
    /// windows is allowed, and an inverted window matches every active car.
    pub async fn available(
        &self,
        start_date: &str,
        end_date: &str,
        class: Option<CarClass>,
    ) -> Result<Vec<Car>, QueryError> {
        let window = DateWindow::parse(start_date, end_date)?;
        let cars = self
            .cars
            .list(CarFilter {
                include_inactive: false,
                class,
            })
            .await?;

        let mut free = Vec::with_capacity(cars.len());
        for car in cars {
            if !self.detector.has_conflict(car.id, &window, None).await? {
                free.push(car);
            }
        }
        Ok(free)
    }

    /// Every car, including inactive ones, regardless of bookings.
    pub async fn all(&self) -> anyhow::Result<Vec<Car>> {
        self.cars
            .list(CarFilter {
                include_inactive: true,
                class: None,
            })
            .await
    }

    /// `None` when the car does not exist or is inactive.
    pub async fn quote(
        &self,
        car_id: Uuid,
        start_date: &str,
        end_date: &str,
    ) -> Result<Option<CarQuote>, QueryError> {
        let window = DateWindow::parse(start_date, end_date)?;
        let Some(car) = self.cars.find_active(car_id).await? else {
            return Ok(None);
        };

        let is_available = !self.detector.has_conflict(car.id, &window, None).await?;
        let (total_price, rental_days) = if is_available {
            (Some(car.quote(&window)), Some(window.days()))
        } else {
            (None, None)
        };

        Ok(Some(CarQuote {
            car,
            window,
            is_available,
            total_price,
            rental_days,
        }))
    }
}
