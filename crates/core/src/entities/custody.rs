//! `CustodySnapshot` and Merkle inclusion proof types (§3, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub holding_id: String,
    pub platform: String,
    pub asset_id: String,
    pub owner_type: String,
    pub owner_id: String,
    pub vault_id: String,
    pub deposit_id: String,
    /// Opaque value-carrying metadata, untouched by the core.
    #[serde(default)]
    pub metadata: Value,
}

impl Holding {
    /// `platform:asset_id|ownerType:ownerId|vault_id|deposit_id|holding_id`
    pub fn holding_key(&self) -> String {
        format!(
            "{}:{}|{}:{}|{}|{}|{}",
            self.platform,
            self.asset_id,
            self.owner_type,
            self.owner_id,
            self.vault_id,
            self.deposit_id,
            self.holding_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodySnapshot {
    pub snapshot_id: String,
    pub recorded_at: DateTime<Utc>,
    pub leaf_count: usize,
    pub root_hash: String,
    /// Sorted by `holding_key`.
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingHash {
    pub position: SiblingPosition,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusionProof {
    pub leaf_index: usize,
    pub leaf_hash: String,
    pub siblings: Vec<SiblingHash>,
}
