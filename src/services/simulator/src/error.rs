//! Error handling for the simulator service
//!
//! One taxonomy shared by every handler: errors are translated to their HTTP
//! status at the edge and rendered as `{"error": "<message>"}`. Internal
//! failures are logged with a correlation id and never leak detail on the
//! wire.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codetel_shared::ErrorBody;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimulatorError>;

#[derive(Error, Debug)]
pub enum SimulatorError {
    /// Bad query parameter, malformed body, enum out of range
    #[error("{message}")]
    InvalidRequest { message: String },

    /// Seed document failed to parse or validate
    #[error("invalid seed: {message}")]
    InvalidSeed { message: String },

    /// Missing or wrong API key
    #[error("unauthorized")]
    Unauthorized,

    /// Unknown repo, PR, developer or path
    #[error("{message}")]
    NotFound { message: String },

    /// Wrong method on a known path
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Admin operation violates a store invariant
    #[error("{message}")]
    Conflict { message: String },

    /// Unexpected generator or store failure
    #[error("internal error")]
    Internal { message: String },
}

impl SimulatorError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn invalid_seed(message: impl Into<String>) -> Self {
        Self::InvalidSeed {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidSeed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidSeed { .. } => "invalid_seed",
            Self::Unauthorized => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal",
        }
    }
}

/// JSON body extractor that routes extraction failures through the shared
/// taxonomy. Axum's stock `Json` rejection replies with a plain-text body;
/// wrapping it here keeps malformed bodies and wrong content types on the
/// `{"error": "<message>"}` shape like every other 400.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = SimulatorError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(SimulatorError::invalid_request(rejection.body_text())),
        }
    }
}

impl IntoResponse for SimulatorError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            SimulatorError::Internal { message } => {
                let correlation_id = Uuid::new_v4();
                error!(%correlation_id, category = self.category(), "{}", message);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            SimulatorError::invalid_request("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SimulatorError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            SimulatorError::not_found("x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SimulatorError::conflict("x").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SimulatorError::internal("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_request_message_is_surfaced_verbatim() {
        let err = SimulatorError::invalid_request("startDate: invalid format");
        assert_eq!(err.to_string(), "startDate: invalid format");
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(SimulatorError::MethodNotAllowed.category(), "method_not_allowed");
        assert_eq!(SimulatorError::internal("boom").category(), "internal");
    }
}
