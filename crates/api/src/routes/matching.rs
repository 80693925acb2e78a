//! `POST /marketplace/matching/runs` (C5 wrapper). Matching runs are
//! partner-triggered (§5); writes proposal rows, so it is authorized
//! against `cycle_proposals:write` rather than a dedicated matching scope
//! (the spec's closed scope list has none).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use swapgraph_core::{ActorType, DomainError};
use swapgraph_domain::MatchingRunRequest;
use swapgraph_matching::MatchStats;

use crate::error::Result;
use crate::middleware::ActorContext;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RunBody {
    pub replace_existing: bool,
    pub max_proposals: Option<usize>,
    pub min_cycle_length: Option<usize>,
    pub max_cycle_length: Option<usize>,
    pub max_enumerated_cycles: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct RunSummary {
    run_id: String,
    selected_proposals_count: usize,
    stats: MatchStats,
}

#[derive(Serialize)]
pub struct RunResponse {
    run: RunSummary,
}

pub async fn run(
    State(state): State<Arc<AppState>>,
    ctx: ActorContext,
    Json(body): Json<RunBody>,
) -> Result<Json<RunResponse>> {
    ctx.require_scope("cycle_proposals:write")?;
    // Header required for contract uniformity (every write carries one);
    // a run is not cached against it since its output is a function of
    // the live snapshot, not of the request body alone.
    let _idempotency_key = ctx.require_idempotency_key()?;
    if ctx.actor.actor_type != ActorType::Partner {
        return Err(ctx.err(DomainError::forbidden("only a partner actor may trigger a matching run")));
    }

    let now = chrono::Utc::now();
    let outcome = state
        .matching_runs
        .run(
            MatchingRunRequest {
                replace_existing: body.replace_existing,
                min_cycle_length: body.min_cycle_length,
                max_cycle_length: body.max_cycle_length,
                max_enumerated_cycles: body.max_enumerated_cycles,
                timeout_ms: body.timeout_ms,
                max_proposals: body.max_proposals,
            },
            now,
        )
        .await
        .map_err(|e| ctx.err(e))?;

    Ok(Json(RunResponse {
        run: RunSummary {
            run_id: outcome.run_id,
            selected_proposals_count: outcome.selected_proposals_count,
            stats: outcome.stats,
        },
    }))
}
