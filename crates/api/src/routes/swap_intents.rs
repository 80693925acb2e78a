//! `/swap-intents` routes (C6). Scopes: `swap_intents:write` for writes,
//! `swap_intents:read` for reads.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use swapgraph_core::{AssetRef, SettlementPreferences, SwapIntent, TimeConstraints, TrustConstraints, ValueBand, WantSpec};
use swapgraph_domain::{CreateIntentRequest, UpdateIntentRequest};

use crate::error::{ApiError, Result};
use crate::idempotency;
use crate::middleware::ActorContext;
use crate::state::AppState;

#[derive(Deserialize, Serialize)]
pub struct CreateSwapIntentBody {
    pub offer: Vec<AssetRef>,
    pub want_spec: WantSpec,
    pub value_band: ValueBand,
    pub trust_constraints: TrustConstraints,
    pub time_constraints: TimeConstraints,
    pub settlement_preferences: SettlementPreferences,
}

#[derive(Deserialize, Serialize, Default)]
pub struct UpdateSwapIntentBody {
    pub offer: Option<Vec<AssetRef>>,
    pub want_spec: Option<WantSpec>,
    pub value_band: Option<ValueBand>,
    pub trust_constraints: Option<TrustConstraints>,
    pub time_constraints: Option<TimeConstraints>,
    pub settlement_preferences: Option<SettlementPreferences>,
}

#[derive(Serialize)]
struct WriteEnvelope<T: Serialize> {
    correlation_id: String,
    #[serde(flatten)]
    result: T,
}

#[derive(Deserialize)]
pub struct ListQuery {
    actor_id: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Json(body): Json<CreateSwapIntentBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("swap_intents:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(ctx.actor.actor_type, ctx.actor.id.clone(), "swap_intents.create", key);
    let now = chrono::Utc::now();
    let actor = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let id = format!("intent_{}", uuid::Uuid::new_v4().simple());
        let intent = state
            .intents
            .create(
                CreateIntentRequest {
                    id,
                    owner: actor,
                    offer: body.offer,
                    want_spec: body.want_spec,
                    value_band: body.value_band,
                    trust_constraints: body.trust_constraints,
                    time_constraints: body.time_constraints,
                    settlement_preferences: body.settlement_preferences,
                },
                now,
            )
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: intent })
            .expect("intent envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(id): Path<String>,
    Json(body): Json<UpdateSwapIntentBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("swap_intents:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("swap_intents.update.{id}"),
        key,
    );
    let now = chrono::Utc::now();
    let correlation_id = ctx.correlation_id.clone();
    let id_for_handler = id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let intent = state
            .intents
            .update(
                &id_for_handler,
                UpdateIntentRequest {
                    offer: body.offer,
                    want_spec: body.want_spec,
                    value_band: body.value_band,
                    trust_constraints: body.trust_constraints,
                    time_constraints: body.time_constraints,
                    settlement_preferences: body.settlement_preferences,
                },
                now,
            )
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: intent })
            .expect("intent envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("swap_intents:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("swap_intents.cancel.{id}"),
        key,
    );
    let now = chrono::Utc::now();
    let correlation_id = ctx.correlation_id.clone();
    let id_for_handler = id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &serde_json::json!({ "id": id }), || async move {
        let intent = state.intents.cancel(&id_for_handler, now).await.map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: intent })
            .expect("intent envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn get(State(state): State<Arc<AppState>>, ctx: ActorContext, Path(id): Path<String>) -> Result<Json<SwapIntent>> {
    ctx.require_scope("swap_intents:read")?;
    let intent = state
        .intents
        .get(&id)
        .await
        .map_err(|e| ctx.err(e))?;
    Ok(Json(intent))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SwapIntent>>> {
    ctx.require_scope("swap_intents:read")?;
    let owner_id = query.actor_id.unwrap_or_else(|| ctx.actor.id.clone());
    let owner = swapgraph_core::Actor::new(ctx.actor.actor_type, owner_id);
    let intents = state.intents.list_by_actor(&owner).await;
    Ok(Json(intents))
}
