//! Request/response types mirroring the HTTP surface's wire shapes (§6).
//! Re-exports the shared entity types from `swapgraph-core` so callers get
//! the exact same `SwapIntent`/`CycleProposal`/etc. representations the
//! server serializes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use swapgraph_core::{
    AssetRef, Commit, CustodySnapshot, CycleProposal, Delegation, Holding, InclusionProof, Receipt,
    SettlementPreferences, SettlementTimeline, SwapIntent, TimeConstraints, TrustConstraints, ValueBand, WantSpec,
};

#[derive(Debug, Clone, Serialize)]
pub struct CreateSwapIntentRequest {
    pub offer: Vec<AssetRef>,
    pub want_spec: WantSpec,
    pub value_band: ValueBand,
    pub trust_constraints: TrustConstraints,
    pub time_constraints: TimeConstraints,
    pub settlement_preferences: SettlementPreferences,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSwapIntentRequest {
    pub offer: Option<Vec<AssetRef>>,
    pub want_spec: Option<WantSpec>,
    pub value_band: Option<ValueBand>,
    pub trust_constraints: Option<TrustConstraints>,
    pub time_constraints: Option<TimeConstraints>,
    pub settlement_preferences: Option<SettlementPreferences>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchingRunRequest {
    pub replace_existing: bool,
    pub max_proposals: Option<usize>,
    pub min_cycle_length: Option<usize>,
    pub max_cycle_length: Option<usize>,
    pub max_enumerated_cycles: Option<usize>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchStats {
    pub candidate_cycles: usize,
    pub candidate_proposals: usize,
    pub selected_proposals: usize,
    pub intents_active: usize,
    pub edges: usize,
    pub cycle_enumeration_limited: bool,
    pub cycle_enumeration_timed_out: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingRunSummary {
    pub run_id: String,
    pub selected_proposals_count: usize,
    pub stats: MatchStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingRunResponse {
    pub run: MatchingRunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptProposalRequest {
    pub intent_id: String,
    pub delegation: Option<Delegation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSettlementRequest {
    pub deposit_deadline_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSettlementResponse {
    pub timeline: SettlementTimeline,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmDepositRequest {
    pub intent_id: String,
    pub deposit_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishCustodySnapshotRequest {
    pub snapshot_id: String,
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustodySnapshotPage {
    pub snapshots: Vec<CustodySnapshot>,
    pub next_cursor: Option<String>,
}
