//! Shared application state threaded through every handler.

use std::sync::Arc;

use swapgraph_core::SigningKey;
use swapgraph_domain::{CommitService, CustodyService, IntentService, MatchingRunService, SettlementService};
use swapgraph_matching::MatchingConfig;
use swapgraph_store::StateStore;

/// Everything a handler needs, built once at startup and cloned (cheaply,
/// behind `Arc`) into the router.
pub struct AppState {
    pub store: Arc<StateStore>,
    pub signing_key: SigningKey,
    pub intents: IntentService,
    pub commits: CommitService,
    pub settlement: SettlementService,
    pub custody: CustodyService,
    pub matching_runs: MatchingRunService,
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<StateStore>, signing_key: SigningKey, matching_config: MatchingConfig) -> Self {
        Self {
            store: store.clone(),
            signing_key: signing_key.clone(),
            intents: IntentService::new(store.clone(), signing_key.clone()),
            commits: CommitService::new(store.clone(), signing_key.clone()),
            settlement: SettlementService::new(store.clone(), signing_key.clone()),
            custody: CustodyService::new(store.clone()),
            matching_runs: MatchingRunService::new(store, matching_config),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
