//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **cars** - Fleet CRUD
//! - **bookings** - Reservations, admin listing and statistics
//! - **status** - Database health check
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let car = state.repos.cars.find_by_id(car_id).await?;
//!     let active = state.repos.bookings.list_active_by_car(car_id).await?;
//! }
//! ```

mod bookings;
mod cars;
mod status;

pub use bookings::{BookingRepo, PgBookingRepo, WriteError};
pub use cars::{CarFilter, CarRepo, PgCarRepo};
pub use status::{PgStatusRepo, StatusRepo};

#[cfg(test)]
pub use bookings::MockBookingRepo;
#[cfg(test)]
pub use cars::MockCarRepo;
#[cfg(test)]
pub use status::MockStatusRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub cars: Arc<dyn CarRepo>,
    pub bookings: Arc<dyn BookingRepo>,
    pub status: Arc<dyn StatusRepo>,
}
