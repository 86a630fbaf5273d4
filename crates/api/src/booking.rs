//! Booking validation, conflict detection and admission.
//!
//! Every rental is a half-open date window `[start_date, end_date)` on one car.
//! Two windows on the same car conflict iff they overlap under half-open
//! semantics, so a booking ending on the 10th and another starting on the 10th
//! can coexist.
//!
//! ## Components
//!
//! - **window** - `DateWindow`, the `YYYY-MM-DD` parser and the overlap predicate
//! - **validator** - business rules for a requested window (`BookingRules`)
//! - **conflict** - overlap of a window against a car's active bookings
//! - **admission** - validate, detect, insert; the exclusion constraint in
//!   PostgreSQL is the final arbiter for concurrent requests
//! - **availability** - which cars are free for a window
//!
//! Nothing here caches availability. It is recomputed from active bookings on
//! every call, so a soft delete frees the car immediately.

mod admission;
mod availability;
mod conflict;
mod validator;
mod window;

pub use admission::{AdmissionController, AdmissionError, AdmissionRequest};
pub use availability::{AvailabilityService, CarQuote, QueryError};
pub use conflict::{ConflictDetector, ConflictError};
pub use validator::{BookingRules, ValidationError};
pub use window::{DATE_FORMAT, DateWindow, parse_date};
