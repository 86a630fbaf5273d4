//! Booking management for administrators.
//!
//! Endpoints (all require the admin bearer token):
//! - GET /api/admin/bookings - Filtered, paginated list with statistics
//! - PUT /api/admin/bookings/{id} - Change status, deposit status or notes
//! - PUT /api/admin/bookings/{id}/dates - Move a booking to new dates
//! - DELETE /api/admin/bookings/{id} - Soft delete, freeing the car

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use garde::Validate;
use uuid::Uuid;

use crate::{
    booking::{ConflictError, parse_date},
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::admin::AdminUser,
    models::{BookingChanges, BookingFilter, BookingStatus},
    payloads::{
        AdminBookingsQuery, BookingUpdatedResponse, BookingsResponse, Pagination,
        RescheduleBookingPayload, UpdateBookingPayload,
    },
    repos::WriteError,
    services::BookingEvent,
    state::AppState,
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings))
        .route("/{id}", put(update_booking).delete(delete_booking))
        .route("/{id}/dates", put(reschedule_booking))
}

#[debug_handler]
async fn list_bookings(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminBookingsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = BookingFilter {
        status: query.status,
        car_id: query.car_id,
        start_date: query
            .start_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(AppError::InvalidDates)?,
        end_date: query
            .end_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(AppError::InvalidDates)?,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let (bookings, statistics) = tokio::try_join!(
        state.repos.bookings.list(filter.clone(), limit, offset),
        state.repos.bookings.statistics(filter)
    )?;

    Ok(Json(BookingsResponse {
        pagination: Pagination {
            limit,
            offset,
            returned: bookings.len(),
        },
        bookings,
        statistics,
    }))
}

#[debug_handler]
async fn update_booking(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let changes = BookingChanges::from(payload);
    if changes.is_empty() {
        return Err(AppError::Validation("No valid fields to update".to_string()));
    }

    let current = state
        .repos
        .bookings
        .find_by_id(id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Booking not found"))?;

    let updated_fields = changes.field_names();
    let booking = match state.repos.bookings.update(id, changes).await {
        Ok(Some(booking)) => booking,
        Ok(None) => return Err(AppError::External(StatusCode::NOT_FOUND, "Booking not found")),
        Err(WriteError::Overlap) => {
            return Err(AppError::Conflict(ConflictError {
                car_id: current.car_id,
                window: current.window(),
            }));
        }
        Err(WriteError::Other(e)) => return Err(AppError::Internal(e)),
    };

    tracing::info!(
        admin = %admin.fingerprint,
        booking_id = %id,
        fields = ?updated_fields,
        "booking updated"
    );

    if current.status.is_active()
        && matches!(
            booking.status,
            BookingStatus::Cancelled | BookingStatus::Deleted
        )
    {
        state
            .notifier
            .notify(BookingEvent::Cancelled {
                booking: booking.clone(),
            })
            .await;
    }

    Ok(Json(BookingUpdatedResponse {
        booking,
        updated_fields,
    }))
}

#[debug_handler]
async fn reschedule_booking(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RescheduleBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .admission
        .reschedule(id, &payload.start_date, &payload.end_date)
        .await
        .map_err(AppError::from_admission)?;

    tracing::info!(admin = %admin.fingerprint, booking_id = %id, "booking dates changed");

    Ok(Json(booking))
}

#[debug_handler]
async fn delete_booking(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let current = state
        .repos
        .bookings
        .find_by_id(id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Booking not found"))?;

    if current.status == BookingStatus::Deleted {
        return Err(AppError::External(
            StatusCode::CONFLICT,
            "Booking is already deleted",
        ));
    }

    let booking = state
        .repos
        .bookings
        .soft_delete(id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Booking not found"))?;

    tracing::info!(
        admin = %admin.fingerprint,
        booking_id = %id,
        previous_status = ?current.status,
        "booking soft deleted"
    );

    if current.status.is_active() {
        state
            .notifier
            .notify(BookingEvent::Cancelled {
                booking: booking.clone(),
            })
            .await;
    }

    Ok(Json(booking))
}
