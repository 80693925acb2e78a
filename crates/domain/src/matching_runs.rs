//! Matching-run service (C5 wrapper): bridges the side-effect-free matching
//! engine into the store. A run takes a snapshot, computes off to the side,
//! then commits proposals in one write — per the concurrency model in §5,
//! matching itself emits no events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use swapgraph_core::DomainResult;
use swapgraph_matching::{run_matching, MatchStats, MatchingConfig, MatchingInput};
use swapgraph_store::StateStore;

pub struct MatchingRunRequest {
    pub replace_existing: bool,
    pub min_cycle_length: Option<usize>,
    pub max_cycle_length: Option<usize>,
    pub max_enumerated_cycles: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_proposals: Option<usize>,
}

pub struct MatchingRunOutcome {
    pub run_id: String,
    pub selected_proposals_count: usize,
    pub stats: MatchStats,
}

#[derive(Clone)]
pub struct MatchingRunService {
    store: Arc<StateStore>,
    config: MatchingConfig,
}

impl MatchingRunService {
    pub fn new(store: Arc<StateStore>, config: MatchingConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self, req: MatchingRunRequest, now: DateTime<Utc>) -> DomainResult<MatchingRunOutcome> {
        let snapshot = self.store.snapshot().await;
        let intents = snapshot.active_intents(now);
        let edge_intents = snapshot.active_edge_intents(now);

        let mut input = MatchingInput::new(intents, edge_intents, now);
        if let Some(min) = req.min_cycle_length {
            input.min_cycle_length = min;
        }
        if let Some(max) = req.max_cycle_length {
            input.max_cycle_length = max;
        }
        input.max_enumerated_cycles = req.max_enumerated_cycles;
        input.timeout_ms = req.timeout_ms;
        input.max_proposals = req.max_proposals;
        input.config = self.config.clone();

        let result = run_matching(&input)
            .map_err(|e| swapgraph_core::DomainError::schema_invalid(e.to_string()))?;

        let selected_proposals_count = result.proposals.len();
        let run_id = format!("run_{}", uuid::Uuid::new_v4().simple());

        self.store
            .write(|doc| {
                if req.replace_existing {
                    doc.proposals.retain(|id, _| doc.commits.values().any(|c| &c.proposal_id == id));
                }
                for proposal in result.proposals {
                    doc.proposals.insert(proposal.id.clone(), proposal);
                }
            })
            .await;

        Ok(MatchingRunOutcome { run_id, selected_proposals_count, stats: result.stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use swapgraph_core::{Actor, ActorType, AssetRef, IntentStatus, SettlementPreferences, SwapIntent, TimeConstraints, TrustConstraints, Urgency, ValueBand, WantClause, WantSpec};

    fn intent(id: &str, offer_asset: &str, want_asset: &str, now: DateTime<Utc>) -> SwapIntent {
        SwapIntent {
            id: id.to_string(),
            owner: Actor::new(ActorType::User, format!("owner_{id}")),
            offer: vec![AssetRef { platform: "steam".into(), asset_id: offer_asset.into(), class: "knife".into(), instance: None, value_usd: 100.0, inventory_snapshot_proof_ref: None }],
            want_spec: WantSpec { any_of: vec![WantClause::SpecificAsset { platform: "steam".into(), asset_key: want_asset.into() }] },
            value_band: ValueBand { min_usd: 50.0, max_usd: 150.0, pricing_source: "test".into() },
            trust_constraints: TrustConstraints { max_cycle_length: 3, min_counterparty_reliability: 0.0 },
            time_constraints: TimeConstraints { expires_at: now + Duration::hours(1), urgency: Urgency::Normal },
            settlement_preferences: SettlementPreferences { require_escrow: true },
            status: IntentStatus::Active,
            reserved_proposal_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn run_writes_selected_proposals_into_the_store() {
        let store = Arc::new(StateStore::new());
        let now = Utc::now();
        store
            .write(|doc| {
                doc.intents.insert("intent_a".to_string(), intent("intent_a", "x", "y", now));
                doc.intents.insert("intent_b".to_string(), intent("intent_b", "y", "x", now));
            })
            .await;

        let svc = MatchingRunService::new(store.clone(), MatchingConfig::default());
        let outcome = svc
            .run(
                MatchingRunRequest {
                    replace_existing: false,
                    min_cycle_length: None,
                    max_cycle_length: None,
                    max_enumerated_cycles: None,
                    timeout_ms: None,
                    max_proposals: None,
                },
                now,
            )
            .await
            .unwrap();

        assert_eq!(outcome.selected_proposals_count, 1);
        let stored = store.read(|doc| doc.proposals.len()).await;
        assert_eq!(stored, 1);
    }
}
