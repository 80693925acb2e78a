//! The single conversion point from [`DomainError`] to the universal HTTP
//! error envelope (§7). Every handler's fallible path funnels through here
//! so the envelope shape cannot drift per-endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use swapgraph_core::canonical::CanonicalError;
use swapgraph_core::DomainError;
use tracing::event;

/// Wraps a [`DomainError`] with the request's correlation id, attached via
/// [`ApiError::with_correlation`] once a handler has extracted its
/// [`crate::middleware::ActorContext`]. Errors surfaced before that point
/// (header validation, extractor rejections) carry no id yet; one is
/// minted at render time so the envelope is still well-formed.
#[derive(Debug)]
pub struct ApiError {
    pub domain: DomainError,
    pub correlation_id: Option<String>,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<DomainError> for ApiError {
    fn from(domain: DomainError) -> Self {
        Self { domain, correlation_id: None }
    }
}

impl From<CanonicalError> for ApiError {
    fn from(e: CanonicalError) -> Self {
        Self { domain: DomainError::schema_invalid(e.to_string()), correlation_id: None }
    }
}

impl ApiError {
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: swapgraph_core::ErrorCode,
    message: String,
    details: serde_json::Value,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    correlation_id: String,
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let domain = self.domain;
        let correlation_id = self.correlation_id.unwrap_or_else(|| format!("corr_req_{}", uuid::Uuid::new_v4()));

        match domain.log_level() {
            tracing::Level::ERROR => event!(tracing::Level::ERROR, code = ?domain.code, message = %domain.message, "request failed"),
            tracing::Level::WARN => event!(tracing::Level::WARN, code = ?domain.code, message = %domain.message, "request failed"),
            _ => event!(tracing::Level::DEBUG, code = ?domain.code, message = %domain.message, "request failed"),
        }

        let status = StatusCode::from_u16(domain.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorEnvelope {
            correlation_id,
            error: ErrorBody { code: domain.code, message: domain.message, details: domain.details },
        };
        (status, Json(body)).into_response()
    }
}
