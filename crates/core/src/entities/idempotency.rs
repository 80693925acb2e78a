//! Idempotency scope key and cached-result record (§3, §4.4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::ActorType;

/// `(actor_type, actor_id, operation_id, client_key)` — the replay boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyScope {
    pub actor_type: ActorType,
    pub actor_id: String,
    pub operation_id: String,
    pub client_key: String,
}

impl IdempotencyScope {
    pub fn new(
        actor_type: ActorType,
        actor_id: impl Into<String>,
        operation_id: impl Into<String>,
        client_key: impl Into<String>,
    ) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
            operation_id: operation_id.into(),
            client_key: client_key.into(),
        }
    }

    /// The `actor_type|actor_id|operation_id|key` rendering used in error
    /// details and as the map key in the registry.
    pub fn scope_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.actor_type.as_str(), self.actor_id, self.operation_id, self.client_key
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub payload_hash: String,
    pub cached_result: Value,
}
