//! `/vault/custody/snapshots` routes (C9). The closed scope list (§6) names
//! only `vault:write`; reads share it since no `vault:read` scope exists.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use swapgraph_core::{CustodySnapshot, Holding, InclusionProof};

use crate::error::{ApiError, Result};
use crate::idempotency;
use crate::middleware::ActorContext;
use crate::state::AppState;

#[derive(Serialize)]
struct WriteEnvelope<T: Serialize> {
    correlation_id: String,
    #[serde(flatten)]
    result: T,
}

#[derive(Deserialize, Serialize)]
pub struct PublishBody {
    pub snapshot_id: String,
    pub holdings: Vec<Holding>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    cursor: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ListResponse {
    snapshots: Vec<CustodySnapshot>,
    next_cursor: Option<String>,
}

pub async fn publish(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Json(body): Json<PublishBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("vault:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("vault.custody.publish.{}", body.snapshot_id),
        key,
    );
    let now = chrono::Utc::now();
    let actor = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let snapshot = state
            .custody
            .publish_snapshot(&actor, &body.snapshot_id, body.holdings.clone(), now)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: snapshot })
            .expect("snapshot envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    ctx.require_scope("vault:write")?;
    let (snapshots, next_cursor) = state
        .custody
        .list_snapshots(query.cursor.as_deref(), query.limit)
        .await
        .map_err(|e| ctx.err(e))?;
    Ok(Json(ListResponse { snapshots, next_cursor }))
}

pub async fn get(State(state): State<Arc<AppState>>, ctx: ActorContext, Path(id): Path<String>) -> Result<Json<CustodySnapshot>> {
    ctx.require_scope("vault:write")?;
    let snapshot = state.custody.get_snapshot(&id).await.map_err(|e| ctx.err(e))?;
    Ok(Json(snapshot))
}

pub async fn proof(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path((id, holding_id)): Path<(String, String)>,
) -> Result<Json<InclusionProof>> {
    ctx.require_scope("vault:write")?;
    let proof = state.custody.get_inclusion_proof(&id, &holding_id).await.map_err(|e| ctx.err(e))?;
    Ok(Json(proof))
}
