//! Shared domain error taxonomy (§7 of the specification).
//!
//! Every mutating or reading operation across the `store`, `matching`, and
//! `domain` crates returns `Result<T, DomainError>`. The API crate owns the
//! single conversion point from `DomainError` to the universal HTTP error
//! envelope, so the envelope shape cannot drift per-endpoint.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The closed set of error codes from the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SchemaInvalid,
    InvalidActorContext,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ConstraintViolation,
    IdempotencyKeyReusePayloadMismatch,
    UpstreamUnavailable,
    ServerError,
}

impl ErrorCode {
    /// HTTP status mapping from §7.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::SchemaInvalid => 400,
            ErrorCode::InvalidActorContext => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::IdempotencyKeyReusePayloadMismatch => 409,
            ErrorCode::ConstraintViolation => 422,
            ErrorCode::UpstreamUnavailable => 503,
            ErrorCode::ServerError => 500,
        }
    }

    /// Whether a client may safely retry with the same idempotency key.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCode::UpstreamUnavailable | ErrorCode::ServerError)
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn schema_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaInvalid, message)
    }

    pub fn invalid_actor_context(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidActorContext, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConstraintViolation, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }

    pub fn idempotency_reuse_mismatch(scope_key: String, original_hash: String, new_hash: String) -> Self {
        Self::new(
            ErrorCode::IdempotencyKeyReusePayloadMismatch,
            "idempotency key reused with a different payload",
        )
        .with_details(serde_json::json!({
            "scope_key": scope_key,
            "original_hash": original_hash,
            "new_hash": new_hash,
        }))
    }

    /// The tracing level this error should be logged at: internal faults are
    /// loud, client mistakes and ordinary precondition conflicts are quiet.
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.code {
            ErrorCode::ServerError | ErrorCode::UpstreamUnavailable => Level::ERROR,
            ErrorCode::Conflict
            | ErrorCode::ConstraintViolation
            | ErrorCode::IdempotencyKeyReusePayloadMismatch => Level::WARN,
            _ => Level::DEBUG,
        }
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;
