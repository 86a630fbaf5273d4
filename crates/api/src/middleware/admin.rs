//! Bearer token authentication for the admin API.
//!
//! Usage: Add `AdminUser` as an extractor parameter to require the admin key.
//!
//! ```ignore
//! async fn my_handler(admin: AdminUser, ...) -> ... {
//!     tracing::info!(admin = %admin.fingerprint, "admin action");
//! }
//! ```

use axum::{
    Json, RequestPartsExt,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use sha2::{Digest, Sha256};

use crate::state::AppState;

/// Caller holding the configured admin API key.
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// Short hex prefix of the key digest, safe to log.
    pub fingerprint: String,
}

impl AdminUser {
    /// Digests are compared instead of raw strings so the comparison does not
    /// depend on the length of the presented token.
    fn verify(presented: &str, expected: &str) -> Option<Self> {
        if expected.is_empty() {
            return None;
        }

        let presented = Sha256::digest(presented.as_bytes());
        let expected = Sha256::digest(expected.as_bytes());

        (presented == expected).then(|| AdminUser {
            fingerprint: hex::encode(&expected[..4]),
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        AdminUser::verify(bearer.token(), &state.config.admin_api_key).ok_or_else(|| {
            tracing::warn!(uri = %parts.uri, "rejected admin request with invalid token");
            AuthError::InvalidToken
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
        };

        let body = serde_json::json!({ "error": message, "details": null });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestStateBuilder;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<AdminUser, AuthError> {
        let state = TestStateBuilder::new().build();
        let mut builder = Request::builder().uri("/api/admin/cars");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();

        AdminUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn accepts_configured_key() {
        let admin = extract(Some("Bearer test-admin-key")).await.unwrap();
        assert_eq!(admin.fingerprint.len(), 8);
    }

    #[tokio::test]
    async fn rejects_wrong_key() {
        assert!(matches!(
            extract(Some("Bearer nope")).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        assert!(matches!(extract(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(
            extract(Some("Basic dXNlcjpwYXNz")).await,
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn empty_configured_key_never_matches() {
        assert!(AdminUser::verify("", "").is_none());
    }

    #[tokio::test]
    async fn rejection_is_401_json() {
        let response = AuthError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
