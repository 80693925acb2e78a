//! Shared fixtures for this crate's unit tests.

#![cfg(test)]

use chrono::{DateTime, Duration, Utc};
use swapgraph_core::{
    Actor, ActorType, AssetRef, EdgeIntent, EdgeIntentType, EntityStatus, IntentStatus,
    SettlementPreferences, SwapIntent, TimeConstraints, TrustConstraints, Urgency, ValueBand, WantClause,
    WantSpec,
};

pub fn asset(platform: &str, asset_id: &str, value_usd: f64) -> AssetRef {
    AssetRef {
        platform: platform.to_string(),
        asset_id: asset_id.to_string(),
        class: "misc".to_string(),
        instance: None,
        value_usd,
        inventory_snapshot_proof_ref: None,
    }
}

/// An intent offering `offer`, wanting `want_platform:want_asset`, with a
/// value band `[min_usd, max_usd]`.
pub fn intent(
    id: &str,
    offer: Vec<AssetRef>,
    want_platform: &str,
    want_asset: &str,
    min_usd: f64,
    max_usd: f64,
    now: DateTime<Utc>,
) -> SwapIntent {
    SwapIntent {
        id: id.to_string(),
        owner: Actor::new(ActorType::User, format!("owner_{id}")),
        offer,
        want_spec: WantSpec {
            any_of: vec![WantClause::SpecificAsset {
                platform: want_platform.to_string(),
                asset_key: want_asset.to_string(),
            }],
        },
        value_band: ValueBand { min_usd, max_usd, pricing_source: "test".to_string() },
        trust_constraints: TrustConstraints { max_cycle_length: 5, min_counterparty_reliability: 0.0 },
        time_constraints: TimeConstraints { expires_at: now + Duration::hours(1), urgency: Urgency::Normal },
        settlement_preferences: SettlementPreferences { require_escrow: true },
        status: IntentStatus::Active,
        reserved_proposal_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn edge_intent(source: &str, target: &str, intent_type: EdgeIntentType, strength: Option<f64>) -> EdgeIntent {
    EdgeIntent {
        id: format!("edge_{source}_{target}"),
        source_intent_id: source.to_string(),
        target_intent_id: target.to_string(),
        intent_type,
        strength,
        status: EntityStatus::Active,
        expires_at: None,
    }
}
