//! Optional pre-shared-key guard for the local API.
//!
//! Keys are compared in constant time.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware: pass the request through when no key is configured or the
/// presented key matches.
pub async fn require_psk(expected_psk: Option<String>, request: Request, next: Next) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let rejection = match presented_key(request.headers()) {
        Some(key) if keys_match(key, &expected) => None,
        Some(_) => Some("Invalid API key"),
        None => Some("Missing API key"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => reject(message),
    }
}

/// The key from `x-api-key`, falling back to an `Authorization: Bearer` token.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

fn keys_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn reject(message: &str) -> Response {
    tracing::warn!("Rejected request: {}", message);
    AppError::Unauthorized(message.to_string()).into_response()
}
