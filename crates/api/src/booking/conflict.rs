use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use super::DateWindow;
use crate::models::Booking;
use crate::repos::BookingRepo;

/// A requested window collides with an existing active booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("car {car_id} is already booked during {window}")]
pub struct ConflictError {
    pub car_id: Uuid,
    pub window: DateWindow,
}

/// First booking in `active` whose window overlaps `window`, skipping `excluding`.
///
/// `active` must already be restricted to pending and confirmed bookings of a
/// single car.
pub fn find_conflict<'a>(
    active: &'a [Booking],
    window: &DateWindow,
    excluding: Option<Uuid>,
) -> Option<&'a Booking> {
    active
        .iter()
        .filter(|booking| Some(booking.id) != excluding)
        .find(|booking| booking.window().overlaps(window))
}

#[derive(Clone)]
pub struct ConflictDetector {
    bookings: Arc<dyn BookingRepo>,
}

impl ConflictDetector {
    pub fn new(bookings: Arc<dyn BookingRepo>) -> Self {
        Self { bookings }
    }

    pub async fn has_conflict(
        &self,
        car_id: Uuid,
        window: &DateWindow,
        excluding: Option<Uuid>,
    ) -> Result<bool> {
        Ok(self.first_conflict(car_id, window, excluding).await?.is_some())
    }

    pub async fn first_conflict(
        &self,
        car_id: Uuid,
        window: &DateWindow,
        excluding: Option<Uuid>,
    ) -> Result<Option<Booking>> {
        let active = self.bookings.list_active_by_car(car_id).await?;
        Ok(find_conflict(&active, window, excluding).cloned())
    }
}
