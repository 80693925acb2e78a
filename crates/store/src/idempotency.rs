//! Idempotency registry operations (C4).
//!
//! `(actor_type, actor_id, operation_id, client_key) -> (payload_hash, cached_result)`.
//! Callers check before executing a handler and record after, both under
//! the same write-lock acquisition so the check-then-record pair is atomic
//! (I1).

use serde_json::Value;
use swapgraph_core::{DomainError, IdempotencyRecord, IdempotencyScope};

use crate::document::Document;

/// What the caller should do next.
pub enum IdempotencyCheck {
    /// No prior record; proceed to execute the handler, then call [`record`].
    Miss,
    /// A prior record with a matching payload hash exists; return this
    /// value verbatim without re-running the handler.
    Replay(Value),
}

/// Look up `scope` against `payload_hash`. Returns `Err` with
/// `IDEMPOTENCY_KEY_REUSE_PAYLOAD_MISMATCH` when the same scope was
/// previously used with a different payload.
pub fn check(doc: &Document, scope: &IdempotencyScope, payload_hash: &str) -> Result<IdempotencyCheck, DomainError> {
    let key = scope.scope_key();
    match doc.idempotency.get(&key) {
        None => Ok(IdempotencyCheck::Miss),
        Some(record) if record.payload_hash == payload_hash => {
            Ok(IdempotencyCheck::Replay(record.cached_result.clone()))
        }
        Some(record) => Err(DomainError::idempotency_reuse_mismatch(
            key,
            record.payload_hash.clone(),
            payload_hash.to_string(),
        )),
    }
}

/// Persist the outcome of a freshly executed handler under `scope`.
pub fn record(doc: &mut Document, scope: &IdempotencyScope, payload_hash: &str, result: Value) {
    doc.idempotency.insert(
        scope.scope_key(),
        IdempotencyRecord {
            payload_hash: payload_hash.to_string(),
            cached_result: result,
        },
    );
}
