//! Cross-cutting request middleware.

pub mod actor_context;
pub mod rate_limit;

pub use actor_context::ActorContext;
pub use rate_limit::{RateLimitConfig, RateLimitLayer};
