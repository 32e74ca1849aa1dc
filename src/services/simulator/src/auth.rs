//! Edge authentication
//!
//! Every non-health endpoint requires the static API key, presented as the
//! HTTP basic-auth username with an empty password. The key is process-level
//! configuration; there are no sessions or tokens.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::SimulatorError;
use crate::state::AppState;

/// Extract the basic-auth username from an Authorization header value
fn basic_username(value: &str) -> Option<String> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let username = credentials.split(':').next().unwrap_or("");
    Some(username.to_string())
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(basic_username);

    match presented {
        Some(username) if username == state.config.api_key => next.run(request).await,
        _ => {
            debug!(path = %request.uri().path(), "rejecting request without valid API key");
            SimulatorError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_extracted_from_basic_credentials() {
        let encoded = STANDARD.encode("secret-key:");
        let value = format!("Basic {}", encoded);
        assert_eq!(basic_username(&value).unwrap(), "secret-key");
    }

    #[test]
    fn non_basic_schemes_are_rejected() {
        assert!(basic_username("Bearer token").is_none());
        assert!(basic_username("Basic not-base64!!!").is_none());
    }

    #[test]
    fn empty_password_is_optional() {
        let encoded = STANDARD.encode("key-without-colon");
        assert_eq!(
            basic_username(&format!("Basic {}", encoded)).unwrap(),
            "key-without-colon"
        );
    }
}
