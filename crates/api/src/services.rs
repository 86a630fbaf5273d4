//! External service abstractions.
//!
//! Each service is abstracted behind a trait to enable mocking in tests.
//!
//! ## Services
//!
//! - **email** - Transactional email via Resend (prod) or SMTP (dev)
//! - **notifier** - Booking lifecycle notifications built on top of email
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     state.notifier.notify(BookingEvent::Cancelled { booking }).await;
//! }
//! ```

mod email;
mod notifier;

pub use email::{EmailSender, EmailSenderImpl, OutgoingEmail};
pub use notifier::{BookingEvent, BookingNotifier, EmailNotifier, NoopNotifier};

#[cfg(test)]
pub use email::MockEmailSender;
#[cfg(test)]
pub use notifier::MockBookingNotifier;
