//! Settlement service (C8): the escrow state machine, unwind, and receipts.
//!
//! The cycle id settlement operates under is the commit id: a commit
//! reaching `ready` is the trigger that lets a partner call `start`, and the
//! resulting timeline, receipt, and every settlement event are all keyed by
//! that same id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use swapgraph_core::{
    Actor, Commit, CommitPhase, DomainError, DomainResult, IntentStatus, Leg, LegStatus, Receipt,
    ReceiptFinalState, SettlementState, SettlementTimeline, SigningKey, Transparency,
};
use swapgraph_store::StateStore;

use crate::events;

#[derive(Clone)]
pub struct SettlementService {
    store: Arc<StateStore>,
    signing_key: SigningKey,
}

pub struct StartResult {
    pub timeline: SettlementTimeline,
    pub replayed: bool,
}

impl SettlementService {
    pub fn new(store: Arc<StateStore>, signing_key: SigningKey) -> Self {
        Self { store, signing_key }
    }

    pub async fn status(&self, cycle_id: &str) -> DomainResult<SettlementTimeline> {
        self.store
            .read(|doc| doc.timelines.get(cycle_id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found(format!("settlement timeline {cycle_id} not found")))
    }

    pub async fn start(
        &self,
        cycle_id: &str,
        partner: &Actor,
        deposit_deadline_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<StartResult> {
        self.store
            .write(|doc| {
                if let Some(existing) = doc.timelines.get(cycle_id) {
                    return Ok(StartResult { timeline: existing.clone(), replayed: true });
                }

                let commit = doc
                    .commits
                    .get(cycle_id)
                    .ok_or_else(|| DomainError::not_found(format!("commit {cycle_id} not found")))?
                    .clone();
                if commit.phase != CommitPhase::Ready {
                    return Err(
                        DomainError::conflict(format!("commit {cycle_id} is not ready")).with_details(
                            serde_json::json!({ "phase": commit.phase }),
                        ),
                    );
                }

                if let Some(tenant) = doc.tenancy.get(cycle_id) {
                    if tenant != partner {
                        return Err(DomainError::forbidden("cycle already claimed by a different partner"));
                    }
                } else {
                    doc.tenancy.insert(cycle_id.to_string(), partner.clone());
                }

                let proposal = doc
                    .proposals
                    .get(&commit.proposal_id)
                    .ok_or_else(|| DomainError::not_found(format!("proposal {} not found", commit.proposal_id)))?
                    .clone();

                let n = proposal.participants.len();
                let legs: Vec<Leg> = (0..n)
                    .map(|i| {
                        let giver = &proposal.participants[i];
                        let receiver = &proposal.participants[(i + n - 1) % n];
                        Leg {
                            leg_id: format!("leg_{cycle_id}_{}", giver.intent_id),
                            intent_id: giver.intent_id.clone(),
                            from_actor: giver.actor.clone(),
                            to_actor: receiver.actor.clone(),
                            assets: giver.give.clone(),
                            status: LegStatus::Pending,
                            deposit_deadline_at,
                            deposit_ref: None,
                            deposited_at: None,
                            release_ref: None,
                            released_at: None,
                            refund_ref: None,
                            refunded_at: None,
                        }
                    })
                    .collect();

                let timeline = SettlementTimeline {
                    cycle_id: cycle_id.to_string(),
                    partner: partner.clone(),
                    state: SettlementState::EscrowPending,
                    legs,
                    updated_at: now,
                };
                doc.timelines.insert(cycle_id.to_string(), timeline.clone());

                let corr = events::cycle_correlation_id(cycle_id);
                events::emit(
                    doc,
                    &self.signing_key,
                    "cycle.state_changed",
                    &corr,
                    &format!("{cycle_id}|start"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "from": "accepted", "to": "escrow.pending" }),
                );
                events::emit(
                    doc,
                    &self.signing_key,
                    "settlement.deposit_required",
                    &corr,
                    &format!("{cycle_id}|deposit_required"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "deposit_deadline_at": deposit_deadline_at }),
                );

                Ok(StartResult { timeline, replayed: false })
            })
            .await
    }

    pub async fn confirm_deposit(
        &self,
        cycle_id: &str,
        intent_id: &str,
        depositor: &Actor,
        deposit_ref: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<SettlementTimeline> {
        self.store
            .write(|doc| {
                let timeline = doc
                    .timelines
                    .get_mut(cycle_id)
                    .ok_or_else(|| DomainError::not_found(format!("settlement timeline {cycle_id} not found")))?;

                let leg = timeline
                    .leg_for_intent_mut(intent_id)
                    .ok_or_else(|| DomainError::schema_invalid(format!("no leg for intent {intent_id}")))?;

                if leg.status == LegStatus::Deposited {
                    if leg.deposit_ref.as_deref() == Some(deposit_ref) {
                        return Ok(timeline.clone());
                    }
                    return Err(DomainError::conflict("deposit already confirmed with a different ref"));
                }
                if leg.status != LegStatus::Pending {
                    return Err(DomainError::conflict(format!("leg for {intent_id} is not pending deposit")));
                }

                leg.status = LegStatus::Deposited;
                leg.deposit_ref = Some(deposit_ref.to_string());
                leg.deposited_at = Some(now);

                let corr = events::cycle_correlation_id(cycle_id);
                events::emit(
                    doc,
                    &self.signing_key,
                    "settlement.deposit_confirmed",
                    &corr,
                    &format!("{cycle_id}|deposit|{intent_id}"),
                    depositor.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "intent_id": intent_id, "deposit_ref": deposit_ref }),
                );

                let timeline = doc.timelines.get_mut(cycle_id).expect("checked present above");
                if timeline.state == SettlementState::EscrowPending && timeline.all_legs_deposited() {
                    timeline.state = SettlementState::EscrowReady;
                    timeline.updated_at = now;
                    events::emit(
                        doc,
                        &self.signing_key,
                        "cycle.state_changed",
                        &corr,
                        &format!("{cycle_id}|escrow_ready"),
                        depositor.clone(),
                        now,
                        serde_json::json!({ "cycle_id": cycle_id, "from": "escrow.pending", "to": "escrow.ready" }),
                    );
                }

                Ok(doc.timelines.get(cycle_id).expect("present").clone())
            })
            .await
    }

    pub async fn begin_execution(
        &self,
        cycle_id: &str,
        partner: &Actor,
        now: DateTime<Utc>,
    ) -> DomainResult<SettlementTimeline> {
        self.store
            .write(|doc| {
                let timeline = doc
                    .timelines
                    .get_mut(cycle_id)
                    .ok_or_else(|| DomainError::not_found(format!("settlement timeline {cycle_id} not found")))?;
                if timeline.state != SettlementState::EscrowReady {
                    return Err(DomainError::conflict(format!("cycle {cycle_id} is not escrow.ready"))
                        .with_details(serde_json::json!({ "state": timeline.state.label() })));
                }
                timeline.state = SettlementState::Executing;
                timeline.updated_at = now;

                let corr = events::cycle_correlation_id(cycle_id);
                events::emit(
                    doc,
                    &self.signing_key,
                    "cycle.state_changed",
                    &corr,
                    &format!("{cycle_id}|executing"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "from": "escrow.ready", "to": "executing" }),
                );
                events::emit(
                    doc,
                    &self.signing_key,
                    "settlement.executing",
                    &corr,
                    &format!("{cycle_id}|executing_started"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id }),
                );

                Ok(doc.timelines.get(cycle_id).expect("present").clone())
            })
            .await
    }

    pub async fn complete(&self, cycle_id: &str, partner: &Actor, now: DateTime<Utc>) -> DomainResult<Receipt> {
        self.store
            .write(|doc| {
                let timeline = doc
                    .timelines
                    .get(cycle_id)
                    .ok_or_else(|| DomainError::not_found(format!("settlement timeline {cycle_id} not found")))?
                    .clone();
                if timeline.state != SettlementState::Executing {
                    return Err(DomainError::conflict(format!("cycle {cycle_id} is not executing"))
                        .with_details(serde_json::json!({ "state": timeline.state.label() })));
                }
                if !timeline.all_legs_deposited() {
                    return Err(DomainError::conflict("not every leg has been deposited"));
                }

                let timeline = doc.timelines.get_mut(cycle_id).expect("checked present above");
                for leg in timeline.legs.iter_mut() {
                    leg.status = LegStatus::Released;
                    leg.release_ref = Some(format!("rel_{cycle_id}_{}", leg.intent_id));
                    leg.released_at = Some(now);
                }
                timeline.state = SettlementState::Completed;
                timeline.updated_at = now;
                let intent_ids: Vec<String> = timeline.legs.iter().map(|l| l.intent_id.clone()).collect();

                release_reservations(doc, &intent_ids, IntentStatus::Settled, "settled", &self.signing_key, cycle_id, now);

                let mut asset_ids: Vec<String> = doc
                    .timelines
                    .get(cycle_id)
                    .expect("present")
                    .legs
                    .iter()
                    .flat_map(|l| l.assets.iter().map(|a| a.platform_key()))
                    .collect();
                asset_ids.sort();
                asset_ids.dedup();
                let mut sorted_intent_ids = intent_ids.clone();
                sorted_intent_ids.sort();

                let receipt_id = Receipt::derive_id(cycle_id, ReceiptFinalState::Completed);
                let mut receipt = Receipt {
                    id: receipt_id,
                    cycle_id: cycle_id.to_string(),
                    final_state: ReceiptFinalState::Completed,
                    intent_ids: sorted_intent_ids,
                    asset_ids,
                    transparency: None,
                    signature: None,
                };
                let signature = self.signing_key.sign(&receipt.signable()).expect("receipt always canonicalizes");
                receipt.signature = Some(signature);
                doc.receipts.insert(cycle_id.to_string(), receipt.clone());

                let corr = events::cycle_correlation_id(cycle_id);
                events::emit(
                    doc,
                    &self.signing_key,
                    "cycle.state_changed",
                    &corr,
                    &format!("{cycle_id}|completed"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "from": "executing", "to": "completed" }),
                );
                events::emit(
                    doc,
                    &self.signing_key,
                    "receipt.created",
                    &corr,
                    &format!("{cycle_id}|receipt|completed"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "receipt_id": receipt.id }),
                );

                Ok(receipt)
            })
            .await
    }

    /// No-op unless the timeline is `escrow.pending`, the deadline has
    /// passed, and not every leg was deposited in time.
    pub async fn expire_deposit_window(&self, cycle_id: &str, now: DateTime<Utc>) -> DomainResult<Option<Receipt>> {
        self.store
            .write(|doc| {
                let Some(timeline) = doc.timelines.get(cycle_id) else {
                    return Ok(None);
                };
                if timeline.state != SettlementState::EscrowPending {
                    return Ok(None);
                }
                let deadline_passed = timeline.legs.iter().any(|l| now > l.deposit_deadline_at);
                if !deadline_passed || timeline.all_legs_deposited() {
                    return Ok(None);
                }

                let timeline = doc.timelines.get_mut(cycle_id).expect("checked present above");
                for leg in timeline.legs.iter_mut() {
                    if leg.status == LegStatus::Deposited {
                        leg.status = LegStatus::Refunded;
                        leg.refund_ref = Some(format!("refund_{cycle_id}_{}", leg.intent_id));
                        leg.refunded_at = Some(now);
                    }
                }
                timeline.state = SettlementState::Failed;
                timeline.updated_at = now;
                let intent_ids: Vec<String> = timeline.legs.iter().map(|l| l.intent_id.clone()).collect();
                let partner = timeline.partner.clone();

                release_reservations(doc, &intent_ids, IntentStatus::Failed, "failed", &self.signing_key, cycle_id, now);

                let mut sorted_intent_ids = intent_ids.clone();
                sorted_intent_ids.sort();
                let mut asset_ids: Vec<String> = doc
                    .timelines
                    .get(cycle_id)
                    .expect("present")
                    .legs
                    .iter()
                    .flat_map(|l| l.assets.iter().map(|a| a.platform_key()))
                    .collect();
                asset_ids.sort();
                asset_ids.dedup();

                let receipt_id = Receipt::derive_id(cycle_id, ReceiptFinalState::Failed);
                let mut receipt = Receipt {
                    id: receipt_id,
                    cycle_id: cycle_id.to_string(),
                    final_state: ReceiptFinalState::Failed,
                    intent_ids: sorted_intent_ids,
                    asset_ids,
                    transparency: Some(Transparency { reason_code: "deposit_timeout".to_string() }),
                    signature: None,
                };
                let signature = self.signing_key.sign(&receipt.signable()).expect("receipt always canonicalizes");
                receipt.signature = Some(signature);
                doc.receipts.insert(cycle_id.to_string(), receipt.clone());

                let corr = events::cycle_correlation_id(cycle_id);
                events::emit(
                    doc,
                    &self.signing_key,
                    "cycle.state_changed",
                    &corr,
                    &format!("{cycle_id}|deposit_timeout"),
                    partner.clone(),
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "from": "escrow.pending", "to": "failed", "reason": "deposit_timeout" }),
                );
                events::emit(
                    doc,
                    &self.signing_key,
                    "receipt.created",
                    &corr,
                    &format!("{cycle_id}|receipt|failed"),
                    partner,
                    now,
                    serde_json::json!({ "cycle_id": cycle_id, "receipt_id": receipt.id }),
                );

                Ok(Some(receipt))
            })
            .await
    }
}

fn release_reservations(
    doc: &mut swapgraph_store::Document,
    intent_ids: &[String],
    new_status: IntentStatus,
    reason: &str,
    signing_key: &SigningKey,
    cycle_id: &str,
    now: DateTime<Utc>,
) {
    let corr = events::cycle_correlation_id(cycle_id);
    for intent_id in intent_ids {
        doc.reservations.remove(intent_id);
        let owner = doc.intents.get(intent_id).map(|i| i.owner.clone());
        if let Some(intent) = doc.intents.get_mut(intent_id) {
            intent.status = new_status;
            intent.reserved_proposal_id = None;
            intent.updated_at = now;
        }
        if let Some(owner) = owner {
            events::emit(
                doc,
                signing_key,
                "intent.unreserved",
                &corr,
                &format!("{intent_id}|{reason}"),
                owner,
                now,
                serde_json::json!({ "intent_id": intent_id, "reason": reason }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use swapgraph_core::{ActorType, ParticipantEntry};
    use std::collections::BTreeMap;

    async fn seed(now: DateTime<Utc>) -> (Arc<StateStore>, Actor) {
        let store = Arc::new(StateStore::new());
        let partner = Actor::new(ActorType::Partner, "p1");
        let a = Actor::new(ActorType::User, "u1");
        let b = Actor::new(ActorType::User, "u2");
        let proposal = swapgraph_core::CycleProposal {
            id: "proposal_1".to_string(),
            participants: vec![
                ParticipantEntry { intent_id: "intent_a".into(), actor: a, give: vec![], get: vec![] },
                ParticipantEntry { intent_id: "intent_b".into(), actor: b, give: vec![], get: vec![] },
            ],
            confidence_score: 0.9,
            value_spread: 0.0,
            explainability: vec![],
            expires_at: now + Duration::hours(1),
        };
        let commit = Commit {
            id: "commit_1".to_string(),
            proposal_id: "proposal_1".to_string(),
            phase: CommitPhase::Ready,
            acceptances: BTreeMap::new(),
            participant_intent_ids: vec!["intent_a".to_string(), "intent_b".to_string()],
            created_at: now,
            updated_at: now,
        };
        store
            .write(|doc| {
                doc.proposals.insert("proposal_1".to_string(), proposal);
                doc.commits.insert("commit_1".to_string(), commit);
            })
            .await;
        (store, partner)
    }

    #[tokio::test]
    async fn start_creates_timeline_with_backwards_legs() {
        let now = Utc::now();
        let (store, partner) = seed(now).await;
        let a = Actor::new(ActorType::User, "u1");
        let b = Actor::new(ActorType::User, "u2");

        let svc = SettlementService::new(store, SigningKey::new("k1", b"secret".to_vec()));
        let result = svc.start("commit_1", &partner, now + Duration::hours(1), now).await.unwrap();
        assert!(!result.replayed);
        assert_eq!(result.timeline.state, SettlementState::EscrowPending);
        let leg_a = result.timeline.legs.iter().find(|l| l.intent_id == "intent_a").unwrap();
        assert_eq!(leg_a.from_actor, a);
        assert_eq!(leg_a.to_actor, b);
    }

    #[tokio::test]
    async fn start_is_idempotent_on_replay() {
        let now = Utc::now();
        let (store, partner) = seed(now).await;
        let svc = SettlementService::new(store, SigningKey::new("k1", b"secret".to_vec()));
        let first = svc.start("commit_1", &partner, now + Duration::hours(1), now).await.unwrap();
        let second = svc.start("commit_1", &partner, now + Duration::hours(1), now).await.unwrap();
        assert!(!first.replayed);
        assert!(second.replayed);
    }

    #[tokio::test]
    async fn full_happy_path_reaches_completed_with_signed_receipt() {
        let now = Utc::now();
        let (store, partner) = seed(now).await;
        let svc = SettlementService::new(store.clone(), SigningKey::new("k1", b"secret".to_vec()));
        svc.start("commit_1", &partner, now + Duration::hours(1), now).await.unwrap();
        let a = Actor::new(ActorType::User, "u1");
        let b = Actor::new(ActorType::User, "u2");
        svc.confirm_deposit("commit_1", "intent_a", &a, "dep_a", now).await.unwrap();
        let timeline = svc.confirm_deposit("commit_1", "intent_b", &b, "dep_b", now).await.unwrap();
        assert_eq!(timeline.state, SettlementState::EscrowReady);
        svc.begin_execution("commit_1", &partner, now).await.unwrap();
        let receipt = svc.complete("commit_1", &partner, now).await.unwrap();
        assert_eq!(receipt.final_state, ReceiptFinalState::Completed);
        assert_eq!(receipt.intent_ids, vec!["intent_a".to_string(), "intent_b".to_string()]);
    }

    #[tokio::test]
    async fn deposit_timeout_refunds_partial_deposits() {
        let now = Utc::now();
        let (store, partner) = seed(now).await;
        let svc = SettlementService::new(store.clone(), SigningKey::new("k1", b"secret".to_vec()));
        svc.start("commit_1", &partner, now + Duration::minutes(30), now).await.unwrap();
        let a = Actor::new(ActorType::User, "u1");
        svc.confirm_deposit("commit_1", "intent_a", &a, "dep_a", now).await.unwrap();

        let later = now + Duration::hours(1);
        let receipt = svc.expire_deposit_window("commit_1", later).await.unwrap().unwrap();
        assert_eq!(receipt.final_state, ReceiptFinalState::Failed);
        assert_eq!(receipt.transparency.unwrap().reason_code, "deposit_timeout");

        let timeline = svc.status("commit_1").await.unwrap();
        assert_eq!(timeline.state, SettlementState::Failed);
        let leg_a = timeline.legs.iter().find(|l| l.intent_id == "intent_a").unwrap();
        assert_eq!(leg_a.status, LegStatus::Refunded);
        let leg_b = timeline.legs.iter().find(|l| l.intent_id == "intent_b").unwrap();
        assert_eq!(leg_b.status, LegStatus::Pending);
    }
}
