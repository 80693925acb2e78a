//! `SwapIntent` and its nested value types (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;

/// One asset a partner is offering or the result of applying a want clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub platform: String,
    /// Platform-scoped asset id.
    pub asset_id: String,
    pub class: String,
    pub instance: Option<String>,
    pub value_usd: f64,
    pub inventory_snapshot_proof_ref: Option<String>,
}

impl AssetRef {
    /// `platform:asset_id` key used to match against `specific_asset` want clauses.
    pub fn platform_key(&self) -> String {
        format!("{}:{}", self.platform, self.asset_id)
    }
}

/// One clause of a `want_spec`'s `any_of` disjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WantClause {
    SpecificAsset { platform: String, asset_key: String },
    Category {
        platform: String,
        category: String,
        wear: Option<String>,
    },
}

impl WantClause {
    /// Whether `asset` satisfies this clause.
    pub fn is_satisfied_by(&self, asset: &AssetRef) -> bool {
        match self {
            WantClause::SpecificAsset { platform, asset_key } => {
                &asset.platform == platform && &asset.asset_id == asset_key
            }
            WantClause::Category { platform, category, wear } => {
                &asset.platform == platform
                    && &asset.class == category
                    && wear.as_deref().map_or(true, |w| asset.instance.as_deref() == Some(w))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantSpec {
    pub any_of: Vec<WantClause>,
}

impl WantSpec {
    /// Whether any asset in `offer` satisfies any clause in this disjunction.
    pub fn is_satisfied_by_any(&self, offer: &[AssetRef]) -> bool {
        self.any_of
            .iter()
            .any(|clause| offer.iter().any(|asset| clause.is_satisfied_by(asset)))
    }

    /// The subset of `offer` that satisfies this want spec — this is the
    /// portion a matched counterparty would actually receive.
    pub fn matching_assets<'a>(&self, offer: &'a [AssetRef]) -> Vec<&'a AssetRef> {
        offer
            .iter()
            .filter(|asset| self.any_of.iter().any(|clause| clause.is_satisfied_by(asset)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueBand {
    pub min_usd: f64,
    pub max_usd: f64,
    /// Free-form provenance tag for the pricing used, e.g. "steam_market_avg_7d".
    pub pricing_source: String,
}

impl ValueBand {
    pub fn is_finite_and_ordered(&self) -> bool {
        self.min_usd.is_finite() && self.max_usd.is_finite() && self.min_usd <= self.max_usd
    }

    pub fn contains(&self, amount_usd: f64) -> bool {
        amount_usd >= self.min_usd && amount_usd <= self.max_usd
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustConstraints {
    pub max_cycle_length: u8,
    pub min_counterparty_reliability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeConstraints {
    pub expires_at: DateTime<Utc>,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPreferences {
    pub require_escrow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Active,
    Reserved,
    Cancelled,
    Settled,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentStatus::Cancelled | IntentStatus::Settled | IntentStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapIntent {
    pub id: String,
    pub owner: Actor,
    pub offer: Vec<AssetRef>,
    pub want_spec: WantSpec,
    pub value_band: ValueBand,
    pub trust_constraints: TrustConstraints,
    pub time_constraints: TimeConstraints,
    pub settlement_preferences: SettlementPreferences,
    pub status: IntentStatus,
    /// Set while `status == Reserved`; names the one proposal this intent
    /// is currently committed to. Invariant: `Some` iff `status == Reserved`.
    pub reserved_proposal_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapIntent {
    pub fn offer_value_usd(&self) -> f64 {
        self.offer.iter().map(|a| a.value_usd).sum()
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == IntentStatus::Active && self.time_constraints.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(platform: &str, id: &str, class: &str, value_usd: f64) -> AssetRef {
        AssetRef {
            platform: platform.to_string(),
            asset_id: id.to_string(),
            class: class.to_string(),
            instance: None,
            value_usd,
            inventory_snapshot_proof_ref: None,
        }
    }

    #[test]
    fn specific_asset_clause_matches_exact_key() {
        let clause = WantClause::SpecificAsset {
            platform: "steam".into(),
            asset_key: "knife_fade".into(),
        };
        let hit = asset("steam", "knife_fade", "knife", 500.0);
        let miss = asset("steam", "knife_doppler", "knife", 500.0);
        assert!(clause.is_satisfied_by(&hit));
        assert!(!clause.is_satisfied_by(&miss));
    }

    #[test]
    fn category_clause_with_wear_constraint() {
        let clause = WantClause::Category {
            platform: "steam".into(),
            category: "knife".into(),
            wear: Some("factory_new".into()),
        };
        let mut hit = asset("steam", "x", "knife", 1.0);
        hit.instance = Some("factory_new".into());
        let mut miss = hit.clone();
        miss.instance = Some("battle_scarred".into());
        assert!(clause.is_satisfied_by(&hit));
        assert!(!clause.is_satisfied_by(&miss));
    }

    #[test]
    fn value_band_ordering() {
        let band = ValueBand { min_usd: 10.0, max_usd: 5.0, pricing_source: "x".into() };
        assert!(!band.is_finite_and_ordered());
        let good = ValueBand { min_usd: 5.0, max_usd: 10.0, pricing_source: "x".into() };
        assert!(good.is_finite_and_ordered());
        assert!(good.contains(7.5));
        assert!(!good.contains(11.0));
    }
}
