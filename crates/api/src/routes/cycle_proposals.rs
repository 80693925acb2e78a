//! `/cycle-proposals` routes (C7). Scopes: `cycle_proposals:read` for
//! reads, `commits:write` for accept/decline (a commit is materialized
//! lazily on first accept, so writes against a proposal are authorized
//! against the commit scope rather than a `cycle_proposals:write` one).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use swapgraph_core::{Commit, CycleProposal, Delegation, DomainError};

use crate::error::{ApiError, Result};
use crate::idempotency;
use crate::middleware::ActorContext;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    actor_id: Option<String>,
}

#[derive(Serialize)]
struct WriteEnvelope<T: Serialize> {
    correlation_id: String,
    #[serde(flatten)]
    result: T,
}

#[derive(Deserialize)]
pub struct AcceptBody {
    pub intent_id: String,
    /// Required when the accepting actor type is `agent` (§4.7).
    pub delegation: Option<Delegation>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CycleProposal>>> {
    ctx.require_scope("cycle_proposals:read")?;
    let actor_id = query.actor_id;
    let proposals = state
        .store
        .read(|doc| {
            let mut proposals: Vec<CycleProposal> = doc.proposals.values().cloned().collect();
            if let Some(actor_id) = &actor_id {
                proposals.retain(|p| p.participants.iter().any(|participant| &participant.actor.id == actor_id));
            }
            proposals.sort_by(|a, b| a.id.cmp(&b.id));
            proposals
        })
        .await;
    Ok(Json(proposals))
}

pub async fn get(State(state): State<Arc<AppState>>, ctx: ActorContext, Path(id): Path<String>) -> Result<Json<CycleProposal>> {
    ctx.require_scope("cycle_proposals:read")?;
    let proposal = state
        .store
        .read(|doc| doc.proposals.get(&id).cloned())
        .await
        .ok_or_else(|| ctx.err(DomainError::not_found(format!("proposal {id} not found"))))?;
    Ok(Json(proposal))
}

pub async fn accept(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(proposal_id): Path<String>,
    Json(body): Json<AcceptBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("commits:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("cycle_proposals.accept.{proposal_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let actor = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();
    let proposal_id_for_handler = proposal_id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let commit: Commit = state
            .commits
            .accept(&proposal_id_for_handler, &body.intent_id, &actor, body.delegation.as_ref(), now)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: commit })
            .expect("commit envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn decline(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(proposal_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("commits:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("cycle_proposals.decline.{proposal_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let correlation_id = ctx.correlation_id.clone();
    let proposal_id_for_handler = proposal_id.clone();

    let (value, _replayed) = idempotency::run(
        &state.store,
        scope,
        &serde_json::json!({ "proposal_id": proposal_id }),
        || async move {
            let commit: Option<Commit> = state.commits.decline(&proposal_id_for_handler, now).await.map_err(ApiError::from)?;
            Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: commit })
                .expect("commit envelope always serializes"))
        },
    )
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}
