//! `CycleProposal` (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::entities::intent::AssetRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub intent_id: String,
    pub actor: Actor,
    /// Assets this participant contributes into the cycle.
    pub give: Vec<AssetRef>,
    /// Assets this participant receives, contributed by the previous
    /// participant in cycle order.
    pub get: Vec<AssetRef>,
}

impl ParticipantEntry {
    pub fn give_value_usd(&self) -> f64 {
        self.give.iter().map(|a| a.value_usd).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleProposal {
    /// Deterministic from the canonical cycle key.
    pub id: String,
    pub participants: Vec<ParticipantEntry>,
    pub confidence_score: f64,
    pub value_spread: f64,
    pub explainability: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl CycleProposal {
    pub fn participant_intent_ids(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.intent_id.as_str()).collect()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Rotate `ids` so the lexicographically smallest id leads — the canonical
/// cycle key (§3, I6).
pub fn rotate_to_smallest(ids: &[String]) -> Vec<String> {
    if ids.is_empty() {
        return Vec::new();
    }
    let (min_idx, _) = ids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .expect("ids is non-empty");
    let mut out = Vec::with_capacity(ids.len());
    out.extend_from_slice(&ids[min_idx..]);
    out.extend_from_slice(&ids[..min_idx]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_to_lexicographically_smallest() {
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(rotate_to_smallest(&ids), vec!["a", "b", "c"]);
    }

    #[test]
    fn rotation_is_idempotent_under_further_rotation() {
        let ids = vec!["b".to_string(), "c".to_string(), "a".to_string()];
        let once = rotate_to_smallest(&ids);
        let twice = rotate_to_smallest(&once);
        assert_eq!(once, twice);
    }
}
