//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK if the database and the rate limit store are reachable,
//! 503 Service Unavailable otherwise.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
    rate_limit_store: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (database, store) = tokio::join!(
        state.repos.status.ping(),
        state.stores.rate_limiter.store().ping()
    );

    if let Err(e) = &database {
        tracing::warn!(error = %e, "database health check failed");
    }
    if let Err(e) = &store {
        tracing::warn!(error = %e, "rate limit store health check failed");
    }

    let healthy = database.is_ok() && store.is_ok();

    let response = HealthResponse {
        status: if healthy { "ok" } else { "unhealthy" },
        database: database.is_ok(),
        rate_limit_store: store.is_ok(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
