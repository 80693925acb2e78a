//! The single in-memory document backing the state store (C3).
//!
//! Six top-level maps plus the append-only `events` log, as named in the
//! specification's persisted state layout (§6), plus two maps the data
//! model (§3) requires that the endpoint table does not name directly:
//! `edge_intents` (explicit allow/prefer/block directives feed the matching
//! engine alongside intents) and `tenancy` (which partner claimed a given
//! settlement cycle).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use swapgraph_core::{
    Actor, Commit, CustodySnapshot, EdgeIntent, EventEnvelope, IdempotencyRecord, Receipt,
    SettlementTimeline, SwapIntent, CycleProposal,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub intents: BTreeMap<String, SwapIntent>,
    pub edge_intents: BTreeMap<String, EdgeIntent>,
    /// `intent_id -> commit_id`, the live reservation mutex (I2).
    pub reservations: BTreeMap<String, String>,
    pub proposals: BTreeMap<String, CycleProposal>,
    pub commits: BTreeMap<String, Commit>,
    pub timelines: BTreeMap<String, SettlementTimeline>,
    pub receipts: BTreeMap<String, Receipt>,
    pub events: Vec<EventEnvelope>,
    pub idempotency: BTreeMap<String, IdempotencyRecord>,
    pub vault_custody_snapshots: BTreeMap<String, CustodySnapshot>,
    /// `cycle_id -> partner actor` that first claimed settlement for that cycle.
    pub tenancy: BTreeMap<String, Actor>,
    pub next_event_sequence: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_intents(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<&SwapIntent> {
        self.intents.values().filter(|i| i.is_active(now)).collect()
    }

    pub fn active_edge_intents(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<&EdgeIntent> {
        self.edge_intents.values().filter(|e| e.is_active(now)).collect()
    }
}
