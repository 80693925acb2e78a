//! `GET /receipts/{cycle_id}` (C8). Scope: `receipts:read`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use swapgraph_core::{DomainError, Receipt};

use crate::error::Result;
use crate::middleware::ActorContext;
use crate::state::AppState;

pub async fn get(State(state): State<Arc<AppState>>, ctx: ActorContext, Path(cycle_id): Path<String>) -> Result<Json<Receipt>> {
    ctx.require_scope("receipts:read")?;
    let receipt = state
        .store
        .read(|doc| doc.receipts.get(&cycle_id).cloned())
        .await
        .ok_or_else(|| ctx.err(DomainError::not_found(format!("receipt for cycle {cycle_id} not found"))))?;
    Ok(Json(receipt))
}
