//! API routes

pub mod custody;
pub mod cycle_proposals;
pub mod health;
pub mod matching;
pub mod receipts;
pub mod settlement;
pub mod swap_intents;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Create the main API router (§6).
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/swap-intents", post(swap_intents::create).get(swap_intents::list))
        .route("/swap-intents/:id", get(swap_intents::get).patch(swap_intents::update))
        .route("/swap-intents/:id/cancel", post(swap_intents::cancel))
        .route("/marketplace/matching/runs", post(matching::run))
        .route("/cycle-proposals", get(cycle_proposals::list))
        .route("/cycle-proposals/:id", get(cycle_proposals::get))
        .route("/cycle-proposals/:id/accept", post(cycle_proposals::accept))
        .route("/cycle-proposals/:id/decline", post(cycle_proposals::decline))
        .route("/settlement/:cycle_id/start", post(settlement::start))
        .route("/settlement/:cycle_id/deposit-confirmed", post(settlement::confirm_deposit))
        .route("/settlement/:cycle_id/begin-execution", post(settlement::begin_execution))
        .route("/settlement/:cycle_id/complete", post(settlement::complete))
        .route("/settlement/:cycle_id/expire-deposit-window", post(settlement::expire_deposit_window))
        .route("/settlement/:cycle_id/status", get(settlement::status))
        .route("/receipts/:cycle_id", get(receipts::get))
        .route("/vault/custody/snapshots", post(custody::publish).get(custody::list))
        .route("/vault/custody/snapshots/:id", get(custody::get))
        .route("/vault/custody/snapshots/:id/holdings/:holding_id/proof", get(custody::proof))
        .with_state(state)
}
