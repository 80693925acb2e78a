//! SwapGraph API server binary.

use std::sync::Arc;

use chrono::Duration;
use swapgraph_api::{telemetry, ApiConfig, AppState, Server, ServerConfig};
use swapgraph_core::SigningKey;
use swapgraph_matching::MatchingConfig;
use swapgraph_store::StateStore;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    telemetry::init();
    info!("starting swapgraph API server");

    let config = match ApiConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let signing_key = SigningKey::new(config.signing_key_id.clone(), config.signing_secret.clone().into_bytes());
    let matching_config = MatchingConfig {
        base_compatibility: config.matching_base_compatibility,
        value_delta_fraction: config.matching_value_delta_fraction,
        proposal_ttl: Duration::seconds(config.matching_proposal_ttl_secs),
    };

    let store = Arc::new(StateStore::new());
    let state = Arc::new(AppState::new(store, signing_key, matching_config));

    let server_config = ServerConfig { host: config.host, port: config.port, enable_cors: config.enable_cors };
    let server = Server::new(server_config, state);

    if let Err(e) = server.start().await {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
