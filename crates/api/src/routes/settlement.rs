//! `/settlement/{cycle_id}` routes (C8). Scopes: `settlement:write` for
//! the transition operations, `settlement:read` for status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swapgraph_core::SettlementTimeline;

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
pub struct StartBody {
    pub deposit_deadline_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize)]
pub struct ConfirmDepositBody {
    pub intent_id: String,
    pub deposit_ref: String,
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
    Json(body): Json<StartBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("settlement:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope =
        swapgraph_core::IdempotencyScope::new(ctx.actor.actor_type, ctx.actor.id.clone(), format!("settlement.start.{cycle_id}"), key);
    let now = chrono::Utc::now();
    let partner = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();
    let cycle_id_for_handler = cycle_id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let result = state
            .settlement
            .start(&cycle_id_for_handler, &partner, body.deposit_deadline_at, now)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope {
            correlation_id: correlation_id.clone(),
            result: serde_json::json!({ "timeline": result.timeline, "replayed": result.replayed }),
        })
        .expect("timeline envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn confirm_deposit(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
    Json(body): Json<ConfirmDepositBody>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("settlement:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("settlement.deposit_confirmed.{cycle_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let depositor = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();
    let cycle_id_for_handler = cycle_id.clone();

    let (value, _replayed) = idempotency::run(&state.store, scope, &body, || async move {
        let timeline: SettlementTimeline = state
            .settlement
            .confirm_deposit(&cycle_id_for_handler, &body.intent_id, &depositor, &body.deposit_ref, now)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: timeline })
            .expect("timeline envelope always serializes"))
    })
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn begin_execution(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("settlement:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("settlement.begin_execution.{cycle_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let partner = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();
    let cycle_id_for_handler = cycle_id.clone();

    let (value, _replayed) = idempotency::run(
        &state.store,
        scope,
        &serde_json::json!({ "cycle_id": cycle_id }),
        || async move {
            let timeline = state.settlement.begin_execution(&cycle_id_for_handler, &partner, now).await.map_err(ApiError::from)?;
            Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: timeline })
                .expect("timeline envelope always serializes"))
        },
    )
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("settlement:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("settlement.complete.{cycle_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let partner = ctx.actor.clone();
    let correlation_id = ctx.correlation_id.clone();
    let cycle_id_for_handler = cycle_id.clone();

    let (value, _replayed) = idempotency::run(
        &state.store,
        scope,
        &serde_json::json!({ "cycle_id": cycle_id }),
        || async move {
            let receipt = state.settlement.complete(&cycle_id_for_handler, &partner, now).await.map_err(ApiError::from)?;
            Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: receipt })
                .expect("receipt envelope always serializes"))
        },
    )
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

/// `POST /settlement/:cycle_id/expire-deposit-window` — sweeps a cycle
/// whose deposit deadline has passed and releases any partial deposits
/// (§4.8 `escrow.pending -> failed`). No scheduled sweep exists in this
/// deployment yet; an operator (or an external cron hitting this route)
/// drives the transition. The handler itself is a safe no-op when the
/// deadline hasn't passed or the cycle isn't `escrow.pending`, so it is
/// safe to poll.
pub async fn expire_deposit_window(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_scope("settlement:write")?;
    let key = ctx.require_idempotency_key()?;

    let scope = swapgraph_core::IdempotencyScope::new(
        ctx.actor.actor_type,
        ctx.actor.id.clone(),
        format!("settlement.expire_deposit_window.{cycle_id}"),
        key,
    );
    let now = chrono::Utc::now();
    let correlation_id = ctx.correlation_id.clone();
    let cycle_id_for_handler = cycle_id.clone();

    let (value, _replayed) = idempotency::run(
        &state.store,
        scope,
        &serde_json::json!({ "cycle_id": cycle_id }),
        || async move {
            let receipt = state.settlement.expire_deposit_window(&cycle_id_for_handler, now).await.map_err(ApiError::from)?;
            Ok(serde_json::to_value(WriteEnvelope { correlation_id: correlation_id.clone(), result: receipt })
                .expect("receipt envelope always serializes"))
        },
    )
    .await
    .map_err(|e| e.with_correlation(ctx.correlation_id.clone()))?;

    Ok(Json(value))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Path(cycle_id): Path<String>,
) -> Result<Json<SettlementTimeline>> {
    ctx.require_scope("settlement:read")?;
    let timeline = state.settlement.status(&cycle_id).await.map_err(|e| ctx.err(e))?;
    Ok(Json(timeline))
}
