//! Domain services (C6-C10): the write-side orchestration layer between
//! the HTTP surface and the state store. Each service owns one slice of
//! the entity graph and is the only code path allowed to mutate it.

pub mod commits;
pub mod custody;
pub mod events;
pub mod intents;
pub mod matching_runs;
pub mod policy;
pub mod settlement;

pub use commits::CommitService;
pub use custody::CustodyService;
pub use intents::{CreateIntentRequest, IntentService, UpdateIntentRequest};
pub use matching_runs::{MatchingRunOutcome, MatchingRunRequest, MatchingRunService};
pub use settlement::{SettlementService, StartResult};
