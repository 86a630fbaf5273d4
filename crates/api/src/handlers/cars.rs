//! Public car catalogue and availability.
//!
//! Endpoints:
//! - GET /api/cars?start_date&end_date[&class] - Active cars free for the window
//! - GET /api/cars/all - Every car, including inactive ones
//! - GET /api/cars/{id} - A single active car
//! - GET /api/cars/{id}/availability?start_date&end_date - Availability and price quote

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{ApiPath, ApiQuery},
    payloads::{AvailabilityQuery, CarAvailabilityResponse, CarsResponse},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_available))
        .route("/all", get(list_all))
        .route("/{id}", get(get_car))
        .route("/{id}/availability", get(car_availability))
}

fn required_window(query: &AvailabilityQuery) -> Result<(&str, &str), AppError> {
    match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AppError::Validation(
            "start_date and end_date are required parameters".to_string(),
        )),
    }
}

/// Cars that can be booked for the requested window.
#[debug_handler]
async fn list_available(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (start, end) = required_window(&query)?;

    let cars = state
        .availability
        .available(start, end, query.class)
        .await
        .map_err(AppError::from_query)?;

    Ok(Json(CarsResponse::from(cars)))
}

#[debug_handler]
async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cars = state.availability.all().await?;
    Ok(Json(CarsResponse::from(cars)))
}

#[debug_handler]
async fn get_car(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let car = state
        .repos
        .cars
        .find_active(id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Car not found"))?;

    Ok(Json(car))
}

#[debug_handler]
async fn car_availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (start, end) = required_window(&query)?;

    let quote = state
        .availability
        .quote(id, start, end)
        .await
        .map_err(AppError::from_query)?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Car not found"))?;

    Ok(Json(CarAvailabilityResponse::from(quote)))
}
