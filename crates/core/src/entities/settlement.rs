//! `SettlementTimeline` — the settlement state machine (§3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::entities::intent::AssetRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    #[serde(rename = "escrow.pending")]
    EscrowPending,
    #[serde(rename = "escrow.ready")]
    EscrowReady,
    Executing,
    Completed,
    Failed,
}

impl SettlementState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SettlementState::Completed | SettlementState::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            SettlementState::EscrowPending => "escrow.pending",
            SettlementState::EscrowReady => "escrow.ready",
            SettlementState::Executing => "executing",
            SettlementState::Completed => "completed",
            SettlementState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Pending,
    Deposited,
    Released,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub leg_id: String,
    pub intent_id: String,
    pub from_actor: Actor,
    pub to_actor: Actor,
    pub assets: Vec<AssetRef>,
    pub status: LegStatus,
    pub deposit_deadline_at: DateTime<Utc>,
    pub deposit_ref: Option<String>,
    pub deposited_at: Option<DateTime<Utc>>,
    pub release_ref: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub refund_ref: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementTimeline {
    pub cycle_id: String,
    pub partner: Actor,
    pub state: SettlementState,
    pub legs: Vec<Leg>,
    pub updated_at: DateTime<Utc>,
}

impl SettlementTimeline {
    pub fn all_legs_deposited(&self) -> bool {
        self.legs.iter().all(|l| l.status == LegStatus::Deposited)
    }

    pub fn leg_for_intent_mut(&mut self, intent_id: &str) -> Option<&mut Leg> {
        self.legs.iter_mut().find(|l| l.intent_id == intent_id)
    }
}

/// The allowed forward transitions (§4.8). Used by the settlement service to
/// reject any move not on this graph with `CONFLICT`.
pub fn is_allowed_transition(from: SettlementState, to: SettlementState) -> bool {
    use SettlementState::*;
    matches!(
        (from, to),
        (EscrowPending, EscrowReady)
            | (EscrowPending, Failed)
            | (EscrowReady, Executing)
            | (Executing, Completed)
    ) || (!from.is_terminal() && to == Failed)
}
