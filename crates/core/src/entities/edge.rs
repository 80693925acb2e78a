//! `EdgeIntent` (explicit directives) and the derived `CompatibilityEdge` (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeIntentType {
    Allow,
    Prefer,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Cancelled,
}

/// An explicit `allow` / `prefer` / `block` directive from one intent to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeIntent {
    pub id: String,
    pub source_intent_id: String,
    pub target_intent_id: String,
    pub intent_type: EdgeIntentType,
    /// Only meaningful (and only ever set) for `Prefer` edges.
    pub strength: Option<f64>,
    pub status: EntityStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EdgeIntent {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == EntityStatus::Active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOrigin {
    Derived,
    Explicit,
    Hybrid,
}

/// A compatibility edge in the matching graph: A → B iff B can satisfy A's
/// want within A's value band, or an explicit allow/prefer edge says so,
/// and no `block` edge vetoes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityEdge {
    pub from_intent_id: String,
    pub to_intent_id: String,
    pub origin: EdgeOrigin,
    pub prefer_strength: f64,
}
