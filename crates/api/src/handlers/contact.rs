//! Public contact form.
//!
//! Endpoints:
//! - POST /api/contact - Forward an inquiry to the rental office by email

use axum::{
    Json, Router, debug_handler, extract::State, http::StatusCode, response::IntoResponse,
    routing::post,
};
use garde::Validate;

use crate::{
    error::AppError,
    extract::ApiJson,
    middleware::rate_limit::ClientIp,
    payloads::{ContactPayload, MessageResponse},
    services::{EmailSender, OutgoingEmail},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_inquiry))
}

fn inquiry_email(admin_email: &str, inquiry: &ContactPayload) -> OutgoingEmail {
    OutgoingEmail {
        to: admin_email.to_string(),
        subject: format!("Website inquiry from {}", inquiry.name),
        body: format!(
            "Name: {name}\n\
             Email: {email}\n\
             Phone: {phone}\n\n\
             {message}\n",
            name = inquiry.name,
            email = inquiry.email,
            phone = inquiry.phone,
            message = inquiry.message,
        ),
    }
}

#[debug_handler]
async fn send_inquiry(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(payload): ApiJson<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_spam() {
        tracing::warn!(%client_ip, "honeypot field filled, rejecting inquiry");
        return Err(AppError::External(StatusCode::BAD_REQUEST, "Invalid request"));
    }

    let payload = payload.normalized();
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let sender = state.email.as_ref().ok_or(AppError::External(
        StatusCode::SERVICE_UNAVAILABLE,
        "Contact form is unavailable",
    ))?;

    sender
        .send(inquiry_email(&state.config.admin_email, &payload))
        .await?;

    tracing::info!(%client_ip, "contact inquiry forwarded");

    Ok(Json(MessageResponse {
        message: "Your message has been sent. We will get back to you soon!",
    }))
}
