//! Fleet management for administrators.
//!
//! Endpoints (all require the admin bearer token):
//! - GET /api/admin/cars - List every car
//! - POST /api/admin/cars - Add a car
//! - PUT /api/admin/cars/{id} - Replace a car's details
//! - DELETE /api/admin/cars/{id} - Remove a car without active bookings

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::{Datelike, Utc};
use garde::Validate;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{ApiJson, ApiPath},
    middleware::admin::AdminUser,
    models::CarDraft,
    payloads::{CarPayload, CarsResponse},
    repos::CarFilter,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars).post(create_car))
        .route("/{id}", put(update_car).delete(delete_car))
}

fn validated(payload: CarPayload) -> Result<CarDraft, AppError> {
    payload
        .validate_with(&Utc::now().year())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(payload.into())
}

#[debug_handler]
async fn list_cars(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let cars = state
        .repos
        .cars
        .list(CarFilter {
            include_inactive: true,
            class: None,
        })
        .await?;

    Ok(Json(CarsResponse::from(cars)))
}

#[debug_handler]
async fn create_car(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CarPayload>,
) -> Result<impl IntoResponse, AppError> {
    let draft = validated(payload)?;
    let car = state.repos.cars.create(draft).await?;

    tracing::info!(admin = %admin.fingerprint, car_id = %car.id, "car created");

    Ok((StatusCode::CREATED, Json(car)))
}

#[debug_handler]
async fn update_car(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CarPayload>,
) -> Result<impl IntoResponse, AppError> {
    let draft = validated(payload)?;
    let car = state
        .repos
        .cars
        .update(id, draft)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Car not found"))?;

    tracing::info!(admin = %admin.fingerprint, car_id = %car.id, "car updated");

    Ok(Json(car))
}

#[debug_handler]
async fn delete_car(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let active = state.repos.bookings.list_active_by_car(id).await?;
    if !active.is_empty() {
        return Err(AppError::External(
            StatusCode::CONFLICT,
            "Cannot delete a car with active bookings",
        ));
    }

    if !state.repos.cars.delete(id).await? {
        return Err(AppError::External(StatusCode::NOT_FOUND, "Car not found"));
    }

    tracing::info!(admin = %admin.fingerprint, car_id = %id, "car deleted");

    Ok(StatusCode::NO_CONTENT)
}
