use std::sync::Arc;

use crate::{
    booking::{AdmissionController, AvailabilityService},
    config::Config,
    repos::Repos,
    services::{BookingNotifier, EmailSender},
    stores::Stores,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral stores (rate limiting).
    pub stores: Stores,
    /// Booking notifications (email).
    pub notifier: Arc<dyn BookingNotifier>,
    /// Direct email, used by the contact form. `None` when no transport is configured.
    pub email: Option<Arc<dyn EmailSender>>,
    /// Booking admission and rescheduling.
    pub admission: Arc<AdmissionController>,
    /// Availability queries.
    pub availability: Arc<AvailabilityService>,
}

impl AppState {
    pub fn new(
        config: Config,
        repos: Repos,
        stores: Stores,
        notifier: Arc<dyn BookingNotifier>,
        email: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        let admission = Arc::new(AdmissionController::new(
            repos.cars.clone(),
            repos.bookings.clone(),
            notifier.clone(),
            config.booking_rules(),
        ));
        let availability = Arc::new(AvailabilityService::new(
            repos.cars.clone(),
            repos.bookings.clone(),
        ));

        Self {
            config,
            repos,
            stores,
            notifier,
            email,
            admission,
            availability,
        }
    }
}
