use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BookingRules, ConflictDetector, ConflictError, DateWindow, ValidationError};
use crate::models::{Booking, CustomerInfo, NewBooking};
use crate::repos::{BookingRepo, CarRepo, WriteError};
use crate::services::{BookingEvent, BookingNotifier};

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("car {0} not found")]
    CarNotFound(Uuid),
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),
    #[error("booking {0} is no longer active")]
    BookingInactive(Uuid),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// A customer's reservation request, dates still in wire format.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub car_id: Uuid,
    pub start_date: String,
    pub end_date: String,
    pub customer: CustomerInfo,
}

/// Decides whether a reservation request becomes a booking.
pub struct AdmissionController {
    cars: Arc<dyn CarRepo>,
    bookings: Arc<dyn BookingRepo>,
    notifier: Arc<dyn BookingNotifier>,
    detector: ConflictDetector,
    rules: BookingRules,
}

impl AdmissionController {
    pub fn new(
        cars: Arc<dyn CarRepo>,
        bookings: Arc<dyn BookingRepo>,
        notifier: Arc<dyn BookingNotifier>,
        rules: BookingRules,
    ) -> Self {
        let detector = ConflictDetector::new(bookings.clone());
        Self {
            cars,
            bookings,
            notifier,
            detector,
            rules,
        }
    }

    /// Validate, check for conflicts and insert.
    ///
    /// The pre-insert conflict check gives a fast, descriptive rejection. Two
    /// requests racing past it are still serialized by the storage exclusion
    /// constraint, and the loser is reported as a conflict as well.
    pub async fn admit(
        &self,
        request: AdmissionRequest,
        today: NaiveDate,
    ) -> Result<Booking, AdmissionError> {
        let window = self
            .rules
            .validate(&request.start_date, &request.end_date, today)?;

        let car = self
            .cars
            .find_active(request.car_id)
            .await?
            .ok_or(AdmissionError::CarNotFound(request.car_id))?;

        if let Some(existing) = self.detector.first_conflict(car.id, &window, None).await? {
            info!(
                car_id = %car.id,
                requested = %window,
                conflicting_booking = %existing.id,
                "booking request conflicts with an active booking"
            );
            return Err(conflict(car.id, window));
        }

        let new_booking = NewBooking {
            car_id: car.id,
            window,
            total_price: car.quote(&window),
            deposit_amount: car.deposit_amount,
            customer: request.customer,
        };

        let booking = match self.bookings.insert(new_booking).await {
            Ok(booking) => booking,
            Err(WriteError::Overlap) => {
                warn!(car_id = %car.id, requested = %window, "lost booking race on insert");
                return Err(conflict(car.id, window));
            }
            Err(WriteError::Other(e)) => return Err(AdmissionError::Persistence(e)),
        };

        info!(
            booking_id = %booking.id,
            reference = %booking.reference(),
            car_id = %car.id,
            window = %window,
            "booking created"
        );

        self.notifier
            .notify(BookingEvent::Created {
                booking: booking.clone(),
                car,
            })
            .await;

        Ok(booking)
    }

    /// Move an existing active booking to a new window.
    ///
    /// Administrators may place bookings in the past or beyond the advance
    /// horizon, so only the format and length rules apply. The booking itself
    /// is excluded from the conflict check.
    pub async fn reschedule(
        &self,
        booking_id: Uuid,
        start_date: &str,
        end_date: &str,
    ) -> Result<Booking, AdmissionError> {
        let window = DateWindow::parse(start_date, end_date)?;
        self.rules.check_duration(&window)?;

        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(AdmissionError::BookingNotFound(booking_id))?;

        if !booking.status.is_active() {
            return Err(AdmissionError::BookingInactive(booking_id));
        }

        if self
            .detector
            .has_conflict(booking.car_id, &window, Some(booking.id))
            .await?
        {
            return Err(conflict(booking.car_id, window));
        }

        let car = self
            .cars
            .find_by_id(booking.car_id)
            .await?
            .ok_or(AdmissionError::CarNotFound(booking.car_id))?;

        match self
            .bookings
            .reschedule(booking.id, window, car.quote(&window))
            .await
        {
            Ok(Some(updated)) => {
                info!(booking_id = %updated.id, from = %booking.window(), to = %window, "booking rescheduled");
                Ok(updated)
            }
            Ok(None) => Err(AdmissionError::BookingNotFound(booking_id)),
            Err(WriteError::Overlap) => Err(conflict(booking.car_id, window)),
            Err(WriteError::Other(e)) => Err(AdmissionError::Persistence(e)),
        }
    }
}

fn conflict(car_id: Uuid, window: DateWindow) -> AdmissionError {
    AdmissionError::Conflict(ConflictError { car_id, window })
}
