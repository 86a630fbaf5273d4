//! Public booking requests.
//!
//! Endpoints:
//! - POST /api/bookings - Request a booking. Returns 201 with the booking and
//!   its reference, 409 if the car is taken for part of the window.
//! - GET /api/bookings/reference/{reference} - Look a booking up by the
//!   reference quoted in the confirmation email

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use garde::Validate;

use crate::{
    booking::AdmissionRequest,
    error::AppError,
    extract::{ApiJson, ApiPath},
    middleware::rate_limit::ClientIp,
    models::Booking,
    payloads::{BookingCreatedResponse, BookingLookupResponse, CreateBookingPayload},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/reference/{reference}", get(find_by_reference))
}

#[debug_handler]
async fn create_booking(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(payload): ApiJson<CreateBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_spam() {
        tracing::warn!(%client_ip, "honeypot field filled, rejecting booking");
        return Err(AppError::External(StatusCode::BAD_REQUEST, "Invalid request"));
    }

    let payload = payload.normalized();
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let request = AdmissionRequest {
        car_id: payload.car_id,
        start_date: payload.start_date.clone(),
        end_date: payload.end_date.clone(),
        customer: payload.customer(Some(client_ip)),
    };

    let booking = state
        .admission
        .admit(request, Utc::now().date_naive())
        .await
        .map_err(AppError::from_admission)?;

    let response = BookingCreatedResponse {
        message: "Booking request received",
        reference: booking.reference(),
        booking,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

#[debug_handler]
async fn find_by_reference(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let id_prefix = Booking::parse_reference(&reference)
        .ok_or_else(|| AppError::Validation("Invalid booking reference".to_string()))?;

    let booking = state
        .repos
        .bookings
        .find_by_reference(id_prefix)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Booking not found"))?;

    let car = state.repos.cars.find_by_id(booking.car_id).await?;

    Ok(Json(BookingLookupResponse::new(booking, car)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use crate::repos::{MockBookingRepo, MockCarRepo};
    use crate::test_utils::{
        InMemoryBookingRepo, InMemoryCarRepo, TestStateBuilder, date, mock_booking, mock_car,
    };
    use chrono::{Days, NaiveDate};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use uuid::Uuid;

    fn in_days(days: u64) -> String {
        let date: NaiveDate = Utc::now().date_naive() + Days::new(days);
        date.format("%Y-%m-%d").to_string()
    }

    fn payload(car_id: Uuid, start: String, end: String) -> CreateBookingPayload {
        serde_json::from_value(serde_json::json!({
            "car_id": car_id,
            "start_date": start,
            "end_date": end,
            "client_first_name": "Maria",
            "client_last_name": "Ivanova",
            "client_email": "maria@example.com",
            "client_phone": "+359 88 123 4567",
        }))
        .unwrap()
    }

    fn ip() -> ClientIp {
        ClientIp("203.0.113.7".to_string())
    }

    #[tokio::test]
    async fn creates_booking_with_reference() {
        let car = mock_car();
        let bookings = Arc::new(InMemoryBookingRepo::default());
        let state = TestStateBuilder::new()
            .with_car_repo(InMemoryCarRepo::with_cars(vec![car.clone()]))
            .with_shared_booking_repo(bookings.clone())
            .build();

        let response = create_booking(
            State(state),
            ip(),
            ApiJson(payload(car.id, in_days(10), in_days(17))),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);

        let stored = bookings.all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, BookingStatus::Pending);
        assert_eq!(stored[0].ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(stored[0].total_price, car.price_per_day * rust_decimal::Decimal::from(7));
    }

    #[tokio::test]
    async fn overlapping_request_returns_409() {
        let car = mock_car();
        let bookings = InMemoryBookingRepo::default();
        let start = Utc::now().date_naive() + Days::new(10);
        bookings.seed(mock_booking(car.id, start, start + Days::new(9)));

        let state = TestStateBuilder::new()
            .with_car_repo(InMemoryCarRepo::with_cars(vec![car.clone()]))
            .with_booking_repo(bookings)
            .build();

        let result = create_booking(
            State(state),
            ip(),
            ApiJson(payload(car.id, in_days(18), in_days(23))),
        )
        .await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn too_short_rental_returns_400() {
        let state = TestStateBuilder::new().build();

        let result = create_booking(
            State(state),
            ip(),
            ApiJson(payload(Uuid::new_v4(), in_days(10), in_days(12))),
        )
        .await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn honeypot_rejects_without_touching_storage() {
        let mut cars = MockCarRepo::new();
        cars.expect_find_active().never();
        let mut bookings = MockBookingRepo::new();
        bookings.expect_insert().never();

        let state = TestStateBuilder::new()
            .with_car_repo(cars)
            .with_booking_repo(bookings)
            .build();

        let mut body = payload(Uuid::new_v4(), in_days(10), in_days(17));
        body.website = Some("http://spam.example".into());

        let result = create_booking(State(state), ip(), ApiJson(body)).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_contact_details_return_400() {
        let state = TestStateBuilder::new().build();

        let mut body = payload(Uuid::new_v4(), in_days(10), in_days(17));
        body.client_email = "not-an-email".into();

        let result = create_booking(State(state), ip(), ApiJson(body)).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reference_lookup_hides_contact_details() {
        let car = mock_car();
        let bookings = InMemoryBookingRepo::default();
        let booking = bookings.seed(mock_booking(car.id, date(2025, 7, 1), date(2025, 7, 8)));

        let state = TestStateBuilder::new()
            .with_car_repo(InMemoryCarRepo::with_cars(vec![car.clone()]))
            .with_booking_repo(bookings)
            .build();

        let reference = booking.reference().to_lowercase();
        let response = find_by_reference(State(state), ApiPath(reference))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["reference"], booking.reference());
        assert_eq!(body["rental_days"], 7);
        assert_eq!(body["car"]["id"], car.id.to_string());
        assert!(body.get("client_email").is_none());
        assert!(body.get("ip_address").is_none());
    }

    #[tokio::test]
    async fn deleted_booking_is_not_found_by_reference() {
        let bookings = InMemoryBookingRepo::default();
        let mut deleted = mock_booking(Uuid::new_v4(), date(2025, 7, 1), date(2025, 7, 8));
        deleted.status = BookingStatus::Deleted;
        let deleted = bookings.seed(deleted);

        let state = TestStateBuilder::new()
            .with_car_repo(InMemoryCarRepo::default())
            .with_booking_repo(bookings)
            .build();

        let result = find_by_reference(State(state), ApiPath(deleted.reference())).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_reference_is_400() {
        let mut bookings = MockBookingRepo::new();
        bookings.expect_find_by_reference().never();
        let state = TestStateBuilder::new().with_booking_repo(bookings).build();

        let result = find_by_reference(State(state), ApiPath("SOF-NOPE".to_string())).await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_car_returns_404() {
        let state = TestStateBuilder::new()
            .with_car_repo(InMemoryCarRepo::default())
            .with_booking_repo(InMemoryBookingRepo::default())
            .build();

        let result = create_booking(
            State(state),
            ip(),
            ApiJson(payload(Uuid::new_v4(), in_days(10), in_days(17))),
        )
        .await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
