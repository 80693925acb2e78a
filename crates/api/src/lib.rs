//! SwapGraph API server (C11): the actor/scope guard, idempotency
//! wrapper, and HTTP routes over the domain services.

pub mod config;
pub mod error;
pub mod idempotency;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use server::{Server, ServerConfig};
pub use state::AppState;
