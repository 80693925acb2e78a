//! The entity types of the data model (§3).

pub mod commit;
pub mod custody;
pub mod edge;
pub mod event;
pub mod idempotency;
pub mod intent;
pub mod proposal;
pub mod receipt;
pub mod settlement;

pub use commit::{Acceptance, Commit, CommitPhase};
pub use custody::{CustodySnapshot, Holding, InclusionProof, SiblingHash, SiblingPosition};
pub use edge::{CompatibilityEdge, EdgeIntent, EdgeIntentType, EdgeOrigin, EntityStatus};
pub use event::EventEnvelope;
pub use idempotency::{IdempotencyRecord, IdempotencyScope};
pub use intent::{
    AssetRef, IntentStatus, SettlementPreferences, SwapIntent, TimeConstraints, TrustConstraints,
    ValueBand, WantClause, WantSpec,
};
pub use proposal::{rotate_to_smallest, CycleProposal, ParticipantEntry};
pub use receipt::{Receipt, ReceiptFinalState, Transparency};
pub use settlement::{Leg, LegStatus, SettlementState, SettlementTimeline};
