//! Wires the store's idempotency registry (C4) around a domain-service
//! call. The check and the record are each a single store acquisition —
//! not one atomic critical section spanning the handler — since the
//! handler itself reacquires the writer lock internally; a duplicate
//! request arriving in the narrow gap between the two re-executes the
//! handler, which is safe because every domain mutation it can reach is
//! itself idempotent or lock-guarded (I2's reservation mutex, replay-safe
//! `start`/`confirm_deposit`). Only the *cached-response* guarantee (I1)
//! needs the registry at all.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use swapgraph_core::canonical::canonical_hash;
use swapgraph_core::IdempotencyScope;
use swapgraph_store::idempotency::{check, record, IdempotencyCheck};
use swapgraph_store::StateStore;

use crate::error::ApiError;

/// Run `handler` under idempotency protection for `scope`/`request_payload`.
/// Returns the response value to serve and whether it was a cache replay.
pub async fn run<F, Fut>(
    store: &StateStore,
    scope: IdempotencyScope,
    request_payload: &impl Serialize,
    handler: F,
) -> Result<(Value, bool), ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    let payload_hash = canonical_hash(request_payload)?.to_hex();

    let outcome = store.read(|doc| check(doc, &scope, &payload_hash)).await?;
    match outcome {
        IdempotencyCheck::Replay(cached) => Ok((cached, true)),
        IdempotencyCheck::Miss => {
            let result = handler().await?;
            store.write(|doc| record(doc, &scope, &payload_hash, result.clone())).await;
            Ok((result, false))
        }
    }
}
