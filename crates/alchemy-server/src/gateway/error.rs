//! Uniform error envelope for both transports.
//!
//! Transport B (HTTP) wraps [`alchemy_core::EngineError`] in [`ApiError`],
//! which carries a `request_id` and maps to an HTTP status per spec §7.
//! Transport A (the RPC tool interface) uses the narrower [`RpcError`],
//! whose response carries exactly `{code, message, details}` with no
//! `request_id` — RPC callers correlate by their own request/response
//! pairing, not a server-issued id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use alchemy_core::EngineError;

/// The `{code, message, details, request_id}` envelope from spec §7,
/// returned by every Transport B error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// Short machine-readable error kind, see [`EngineError::code`].
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Extra structured context (e.g. `retry_after_ms`), or `null`.
    pub details: Value,
    /// Correlates this response with server-side logs for the request.
    pub request_id: Uuid,
}

/// An [`EngineError`] paired with the request id it failed under, ready to
/// be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    engine: EngineError,
    request_id: Uuid,
}

impl ApiError {
    /// Wraps `engine` with a freshly generated request id.
    pub fn new(engine: impl Into<EngineError>) -> Self {
        Self {
            engine: engine.into(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Wraps `engine` with a caller-supplied request id, so a handler that
    /// already minted one for tracing keeps the same id in the response.
    pub fn with_request_id(engine: impl Into<EngineError>, request_id: Uuid) -> Self {
        Self {
            engine: engine.into(),
            request_id,
        }
    }

    fn status(&self) -> StatusCode {
        match &self.engine {
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            EngineError::Canceled
            | EngineError::StoreConflict(_)
            | EngineError::PhaseExhausted(_)
            | EngineError::JudgeUnavailable(_)
            | EngineError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match &self.engine {
            EngineError::RateLimited { retry_after_ms } => {
                serde_json::json!({ "retry_after_ms": retry_after_ms })
            }
            EngineError::Timeout { elapsed_ms } => {
                serde_json::json!({ "elapsed_ms": elapsed_ms })
            }
            _ => Value::Null,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            code: self.engine.code(),
            message: self.engine.to_string(),
            details: self.details(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

impl<E: Into<EngineError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError::new(err)
    }
}

/// The narrow `{code, message, details}` record Transport A's response
/// channel carries on failure, never the broader HTTP envelope.
#[derive(Debug, Serialize)]
pub struct RpcError {
    /// Short machine-readable error kind.
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Extra structured context, or `null`.
    pub details: Value,
}

impl From<EngineError> for RpcError {
    fn from(engine: EngineError) -> Self {
        let details = match &engine {
            EngineError::RateLimited { retry_after_ms } => {
                serde_json::json!({ "retry_after_ms": retry_after_ms })
            }
            EngineError::Timeout { elapsed_ms } => {
                serde_json::json!({ "elapsed_ms": elapsed_ms })
            }
            _ => Value::Null,
        };
        Self {
            code: engine.code(),
            message: engine.to_string(),
            details,
        }
    }
}
