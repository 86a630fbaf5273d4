//! Per-IP rate limiting for the public API.
//!
//! ```ignore
//! Router::new()
//!     .nest("/api/cars", handlers::cars::router())
//!     .route_layer(axum::middleware::from_fn_with_state(state, limit_by_ip))
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{error::AppError, state::AppState, stores::RateLimitResult};

/// Client address used as the rate limit key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        if trust_forwarded_for {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());

            if let Some(ip) = forwarded {
                return ClientIp(ip.to_string());
            }
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| ClientIp(addr.ip().to_string()))
            .unwrap_or_else(|| ClientIp("unknown".to_string()))
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, state.config.trust_forwarded_for))
    }
}

pub async fn limit_by_ip(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    match state.stores.rate_limiter.allow(&ip, Utc::now()).await {
        Ok(RateLimitResult::Allowed(_)) => next.run(request).await,
        Ok(RateLimitResult::Throttled { count, retry_after }) => {
            tracing::warn!(client_ip = %ip, count, "rate limit exceeded");
            AppError::Throttled { retry_after }.into_response()
        }
        Err(e) => AppError::Internal(e.context("rate limit store")).into_response(),
    }
}
