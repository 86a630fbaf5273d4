pub mod admin_bookings;
pub mod admin_cars;
pub mod bookings;
pub mod cars;
pub mod contact;
pub mod health;

use axum::Router;

use crate::{middleware::rate_limit::limit_by_ip, state::AppState};

/// Application routes. Public endpoints are rate limited per client IP,
/// admin endpoints are not.
pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .nest("/cars", cars::router())
        .nest("/bookings", bookings::router())
        .nest("/contact", contact::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            limit_by_ip,
        ));

    let admin = Router::new()
        .nest("/cars", admin_cars::router())
        .nest("/bookings", admin_bookings::router());

    Router::new()
        .nest("/health", health::router())
        .nest("/api", public.nest("/admin", admin))
        .with_state(state)
}
