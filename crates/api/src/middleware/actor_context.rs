//! The actor/scope guard (C11, §4.11): every inbound request carries
//! `x-actor-type`, `x-actor-id`, `x-auth-scopes` (space-separated), and an
//! optional `x-correlation-id`. Writes additionally require
//! `idempotency-key`.

use std::collections::HashSet;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use swapgraph_core::{Actor, ActorType, DomainError};

use crate::error::ApiError;

/// The actor context extracted from request headers, available to every
/// handler via `ActorContext::from_parts`.
pub struct ActorContext {
    pub actor: Actor,
    pub scopes: HashSet<String>,
    pub correlation_id: String,
    pub idempotency_key: Option<String>,
}

impl ActorContext {
    /// Build an [`ApiError`] pre-stamped with this request's correlation id,
    /// so every failure past this point reports the id a success would have.
    pub fn err(&self, domain: DomainError) -> ApiError {
        ApiError::from(domain).with_correlation(self.correlation_id.clone())
    }

    pub fn require_scope(&self, scope: &str) -> Result<(), ApiError> {
        if self.scopes.contains(scope) {
            Ok(())
        } else {
            Err(self.err(DomainError::forbidden(format!("missing required scope: {scope}"))))
        }
    }

    /// Writes require `idempotency-key`; reads never call this.
    pub fn require_idempotency_key(&self) -> Result<String, ApiError> {
        self.idempotency_key
            .clone()
            .ok_or_else(|| self.err(DomainError::invalid_actor_context("idempotency-key header is required for writes")))
    }
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| -> Option<&str> { parts.headers.get(name).and_then(|v| v.to_str().ok()) };

        let actor_type_raw = header_str("x-actor-type")
            .ok_or_else(|| DomainError::invalid_actor_context("missing x-actor-type header"))?;
        let actor_type = ActorType::parse(actor_type_raw)
            .ok_or_else(|| DomainError::invalid_actor_context(format!("unknown actor type: {actor_type_raw}")))?;
        let actor_id = header_str("x-actor-id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::invalid_actor_context("missing x-actor-id header"))?;
        let scopes_raw = header_str("x-auth-scopes")
            .ok_or_else(|| DomainError::invalid_actor_context("missing x-auth-scopes header"))?;
        let scopes: HashSet<String> = scopes_raw.split_whitespace().map(str::to_string).collect();

        let correlation_id = header_str("x-correlation-id")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("corr_req_{}", uuid::Uuid::new_v4()));
        let idempotency_key = header_str("idempotency-key").filter(|s| !s.is_empty()).map(str::to_string);

        Ok(ActorContext {
            actor: Actor::new(actor_type, actor_id),
            scopes,
            correlation_id,
            idempotency_key,
        })
    }
}
