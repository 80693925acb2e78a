//! Liveness endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    timestamp: i64,
    backend: BackendSummary,
}

#[derive(Serialize)]
struct BackendSummary {
    intents: usize,
    proposals: usize,
    commits: usize,
    timelines: usize,
    receipts: usize,
    events: usize,
    snapshots: usize,
}

/// `GET /healthz` — liveness plus a backend summary (§6).
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    let backend = state
        .store
        .read(|doc| BackendSummary {
            intents: doc.intents.len(),
            proposals: doc.proposals.len(),
            commits: doc.commits.len(),
            timelines: doc.timelines.len(),
            receipts: doc.receipts.len(),
            events: doc.events.len(),
            snapshots: doc.vault_custody_snapshots.len(),
        })
        .await;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        timestamp: chrono::Utc::now().timestamp(),
        backend,
    }))
}
