//! Authentication of inbound signals.
//!
//! The CRM sends the shared webhook secret as a bearer token. It is compared
//! in constant time. With no secret configured the endpoints are open, which
//! is only meant for local development.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use subtle::ConstantTimeEq;

use crate::AppState;

/// Proof that the request carried the webhook secret (or that none is configured).
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth;

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.webhook_secret.as_deref() else {
            return Ok(WebhookAuth);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ");
                if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) {
                    Ok(WebhookAuth)
                } else {
                    Err((StatusCode::UNAUTHORIZED, "Invalid webhook secret"))
                }
            }
            Some(_) => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
            None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}
