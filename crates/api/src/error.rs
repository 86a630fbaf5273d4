use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::booking::{AdmissionError, ConflictError, DATE_FORMAT, QueryError, ValidationError};

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Validation errors - safe to show
    Validation(String),
    /// A booking date rule was broken
    InvalidDates(ValidationError),
    /// The car is already booked for part of the window
    Conflict(ConflictError),
    /// Too many requests from this client
    Throttled { retry_after: Duration },
}

impl AppError {
    pub fn from_admission(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Validation(e) => Self::InvalidDates(e),
            AdmissionError::CarNotFound(_) => Self::External(StatusCode::NOT_FOUND, "Car not found"),
            AdmissionError::BookingNotFound(_) => {
                Self::External(StatusCode::NOT_FOUND, "Booking not found")
            }
            AdmissionError::BookingInactive(_) => Self::External(
                StatusCode::CONFLICT,
                "Only pending or confirmed bookings can be changed",
            ),
            AdmissionError::Conflict(e) => Self::Conflict(e),
            AdmissionError::Persistence(e) => Self::Internal(e),
        }
    }

    pub fn from_query(err: QueryError) -> Self {
        match err {
            QueryError::Validation(e) => Self::InvalidDates(e),
            QueryError::Persistence(e) => Self::Internal(e),
        }
    }
}

fn body(error: &str, details: Value) -> Json<Value> {
    Json(json!({ "error": error, "details": details }))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    body("Internal server error", Value::Null),
                )
                    .into_response()
            }
            AppError::External(status, msg) => (status, body(msg, Value::Null)).into_response(),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, body("Validation failed", json!(msg))).into_response()
            }
            AppError::InvalidDates(rule) => (
                StatusCode::BAD_REQUEST,
                body(
                    &rule.to_string(),
                    json!({ "rule": rule.code() }),
                ),
            )
                .into_response(),
            AppError::Conflict(conflict) => (
                StatusCode::CONFLICT,
                body(
                    "Car is not available for the selected dates",
                    json!({
                        "car_id": conflict.car_id,
                        "start_date": conflict.window.start.format(DATE_FORMAT).to_string(),
                        "end_date": conflict.window.end.format(DATE_FORMAT).to_string(),
                    }),
                ),
            )
                .into_response(),
            AppError::Throttled { retry_after } => {
                // Round up so clients never retry before the window has closed.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    body(
                        "Too many requests",
                        json!({ "retry_after_secs": secs }),
                    ),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
