//! Booking notifications.
//!
//! Notifications are fire-and-forget. A failed email is logged and never
//! turns an admitted booking into an error.

use std::sync::Arc;

use async_trait::async_trait;

use super::{EmailSender, OutgoingEmail};
use crate::booking::DATE_FORMAT;
use crate::models::{Booking, Car};

#[derive(Debug, Clone)]
pub enum BookingEvent {
    Created { booking: Booking, car: Car },
    Cancelled { booking: Booking },
}

impl BookingEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            Self::Created { booking, .. } | Self::Cancelled { booking } => booking,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn notify(&self, event: BookingEvent);
}

/// Emails the customer and the rental office.
pub struct EmailNotifier {
    sender: Arc<dyn EmailSender>,
    admin_email: String,
}

impl EmailNotifier {
    pub fn new(sender: Arc<dyn EmailSender>, admin_email: String) -> Self {
        Self {
            sender,
            admin_email,
        }
    }

    fn messages(&self, event: &BookingEvent) -> Vec<OutgoingEmail> {
        match event {
            BookingEvent::Created { booking, car } => vec![
                customer_confirmation(booking, car),
                admin_new_booking(&self.admin_email, booking, car),
            ],
            BookingEvent::Cancelled { booking } => vec![customer_cancellation(booking)],
        }
    }
}

#[async_trait]
impl BookingNotifier for EmailNotifier {
    async fn notify(&self, event: BookingEvent) {
        let messages = self.messages(&event);
        let reference = event.booking().reference();
        let sender = self.sender.clone();

        tokio::spawn(deliver(sender, messages, reference));
    }
}

async fn deliver(sender: Arc<dyn EmailSender>, messages: Vec<OutgoingEmail>, reference: String) {
    for message in messages {
        let to = message.to.clone();
        match sender.send(message).await {
            Ok(()) => tracing::info!(%reference, %to, "booking email sent"),
            Err(e) => tracing::error!(%reference, %to, error = %e, "failed to send booking email"),
        }
    }
}

fn customer_confirmation(booking: &Booking, car: &Car) -> OutgoingEmail {
    let window = booking.window();
    OutgoingEmail {
        to: booking.client_email.clone(),
        subject: format!("Booking request received - {}", booking.reference()),
        body: format!(
            "Hello {name},\n\n\
             We have received your booking request {reference}.\n\n\
             Car: {brand} {model} ({year})\n\
             Pick-up: {start}\n\
             Return: {end}\n\
             Rental days: {days}\n\
             Total price: {total} EUR\n\
             Deposit: {deposit} EUR\n\n\
             Your booking is pending. We will contact you to confirm it.\n\n\
             SofCar",
            name = booking.client_first_name,
            reference = booking.reference(),
            brand = car.brand,
            model = car.model,
            year = car.year,
            start = booking.start_date.format(DATE_FORMAT),
            end = booking.end_date.format(DATE_FORMAT),
            days = window.days(),
            total = booking.total_price,
            deposit = booking.deposit_amount,
        ),
    }
}

fn admin_new_booking(admin_email: &str, booking: &Booking, car: &Car) -> OutgoingEmail {
    OutgoingEmail {
        to: admin_email.to_string(),
        subject: format!("New booking {} - {} {}", booking.reference(), car.brand, car.model),
        body: format!(
            "New booking {reference}\n\n\
             Customer: {name}\n\
             Email: {email}\n\
             Phone: {phone}\n\n\
             Car: {brand} {model} ({car_id})\n\
             Dates: {window}\n\
             Total price: {total} EUR\n\
             Notes: {notes}\n",
            reference = booking.reference(),
            name = booking.client_name(),
            email = booking.client_email,
            phone = booking.client_phone,
            brand = car.brand,
            model = car.model,
            car_id = car.id,
            window = booking.window(),
            total = booking.total_price,
            notes = booking.notes.as_deref().unwrap_or("-"),
        ),
    }
}

fn customer_cancellation(booking: &Booking) -> OutgoingEmail {
    OutgoingEmail {
        to: booking.client_email.clone(),
        subject: format!("Booking cancelled - {}", booking.reference()),
        body: format!(
            "Hello {name},\n\n\
             Your booking {reference} from {start} to {end} has been cancelled.\n\n\
             SofCar",
            name = booking.client_first_name,
            reference = booking.reference(),
            start = booking.start_date.format(DATE_FORMAT),
            end = booking.end_date.format(DATE_FORMAT),
        ),
    }
}

/// Notifier that drops every event. Used when no mail transport is configured.
pub struct NoopNotifier;

#[async_trait]
impl BookingNotifier for NoopNotifier {
    async fn notify(&self, event: BookingEvent) {
        tracing::debug!(reference = %event.booking().reference(), "email disabled, skipping notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockEmailSender;
    use crate::test_utils::{date, mock_booking, mock_car};

    fn created() -> BookingEvent {
        let car = mock_car();
        let booking = mock_booking(car.id, date(2025, 6, 1), date(2025, 6, 8));
        BookingEvent::Created { booking, car }
    }

    #[test]
    fn created_event_emails_customer_and_office() {
        let notifier = EmailNotifier::new(Arc::new(MockEmailSender::new()), "office@sof-car.eu".into());
        let event = created();

        let messages = notifier.messages(&event);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].to, event.booking().client_email);
        assert!(messages[0].body.contains(&event.booking().reference()));
        assert!(messages[0].body.contains("Rental days: 7"));
        assert_eq!(messages[1].to, "office@sof-car.eu");
        assert!(messages[1].body.contains(&event.booking().client_phone));
    }

    #[test]
    fn cancellation_emails_customer_only() {
        let notifier = EmailNotifier::new(Arc::new(MockEmailSender::new()), "office@sof-car.eu".into());
        let event = BookingEvent::Cancelled {
            booking: mock_booking(uuid::Uuid::new_v4(), date(2025, 6, 1), date(2025, 6, 8)),
        };

        let messages = notifier.messages(&event);

        assert_eq!(messages.len(), 1);
        assert!(messages[0].subject.starts_with("Booking cancelled"));
    }

    #[tokio::test]
    async fn delivery_continues_after_a_failed_message() {
        let mut sender = MockEmailSender::new();
        let mut seq = mockall::Sequence::new();
        sender
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("smtp timeout")));
        sender
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let notifier = EmailNotifier::new(Arc::new(MockEmailSender::new()), "office@sof-car.eu".into());
        let messages = notifier.messages(&created());

        deliver(Arc::new(sender), messages, "SOFTEST".into()).await;
    }
}
