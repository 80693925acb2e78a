//! `Commit` — the two-phase acceptance aggregate bound to a proposal (§3, §4.7).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPhase {
    Pending,
    Ready,
    Declined,
    Expired,
}

impl CommitPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CommitPhase::Declined | CommitPhase::Expired)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acceptance {
    pub actor: Actor,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub proposal_id: String,
    pub phase: CommitPhase,
    /// Keyed by participant intent id.
    pub acceptances: BTreeMap<String, Acceptance>,
    pub participant_intent_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commit {
    /// `commit_<12-hex(sha256("commit|"+proposal_id))>`.
    pub fn derive_id(proposal_id: &str) -> String {
        let digest = crate::canonical::sha256(format!("commit|{proposal_id}").as_bytes());
        format!("commit_{}", digest.short_hex(12))
    }

    pub fn is_ready(&self) -> bool {
        self.participant_intent_ids
            .iter()
            .all(|id| self.acceptances.contains_key(id))
    }
}
