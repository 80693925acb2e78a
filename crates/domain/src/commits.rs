//! Commit service (C7): lazy two-phase acceptance over a `CycleProposal`.
//!
//! A `Commit` does not exist until the first participant accepts (§4.7); this
//! keeps a proposal that nobody ever looks at from cluttering the document.
//! Accept reserves the accepting intent for the lifetime of the commit —
//! at most one non-terminal commit may hold a given intent's reservation at
//! a time (I2) — and the commit becomes `ready` the moment every participant
//! has accepted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use swapgraph_core::{
    Acceptance, Actor, ActorType, Commit, CommitPhase, Delegation, DomainError, DomainResult, IntentStatus,
    SigningKey,
};
use swapgraph_store::StateStore;

use crate::events;
use crate::policy;

#[derive(Clone)]
pub struct CommitService {
    store: Arc<StateStore>,
    signing_key: SigningKey,
}

impl CommitService {
    pub fn new(store: Arc<StateStore>, signing_key: SigningKey) -> Self {
        Self { store, signing_key }
    }

    pub async fn get(&self, commit_id: &str) -> DomainResult<Commit> {
        self.store
            .read(|doc| doc.commits.get(commit_id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found(format!("commit {commit_id} not found")))
    }

    /// Accept `proposal_id` on behalf of `intent_id`. `acting_actor` is the
    /// caller; for an agent acting under delegation, pass the delegation so
    /// the trading-policy and quiet-hours checks in §4.7 can run.
    pub async fn accept(
        &self,
        proposal_id: &str,
        intent_id: &str,
        acting_actor: &Actor,
        delegation: Option<&Delegation>,
        now: DateTime<Utc>,
    ) -> DomainResult<Commit> {
        self.store
            .write(|doc| {
                let proposal = doc
                    .proposals
                    .get(proposal_id)
                    .ok_or_else(|| DomainError::not_found(format!("proposal {proposal_id} not found")))?
                    .clone();
                if proposal.is_expired(now) {
                    return Err(DomainError::conflict(format!("proposal {proposal_id} has expired")));
                }

                let participant = proposal
                    .participants
                    .iter()
                    .find(|p| p.intent_id == intent_id)
                    .ok_or_else(|| DomainError::schema_invalid(format!("{intent_id} is not a participant in {proposal_id}")))?
                    .clone();

                let owns = match acting_actor.actor_type {
                    ActorType::Agent => {
                        let delegation = delegation
                            .ok_or_else(|| DomainError::forbidden("agent actor requires a delegation"))?;
                        if delegation.subject != participant.actor {
                            return Err(DomainError::forbidden("delegation subject does not own this intent"));
                        }
                        policy::evaluate_proposal_against_trading_policy(&proposal, delegation)?;
                        policy::evaluate_quiet_hours_policy(delegation, now)?;
                        true
                    }
                    _ => &participant.actor == acting_actor,
                };
                if !owns {
                    return Err(DomainError::forbidden("actor does not own this intent"));
                }

                let commit_id = Commit::derive_id(proposal_id);
                let commit = doc.commits.entry(commit_id.clone()).or_insert_with(|| Commit {
                    id: commit_id.clone(),
                    proposal_id: proposal_id.to_string(),
                    phase: CommitPhase::Pending,
                    acceptances: Default::default(),
                    participant_intent_ids: proposal.participant_intent_ids().into_iter().map(str::to_string).collect(),
                    created_at: now,
                    updated_at: now,
                });

                if commit.phase.is_terminal() {
                    return Err(DomainError::conflict(format!("commit {commit_id} is already {:?}", commit.phase)));
                }

                if !commit.acceptances.contains_key(intent_id) {
                    if let Some(existing) = doc.reservations.get(intent_id) {
                        if existing != &commit_id {
                            return Err(DomainError::conflict(format!(
                                "intent {intent_id} is already reserved by commit {existing}"
                            )));
                        }
                    } else {
                        doc.reservations.insert(intent_id.to_string(), commit_id.clone());
                        if let Some(intent) = doc.intents.get_mut(intent_id) {
                            intent.status = IntentStatus::Reserved;
                            intent.reserved_proposal_id = Some(proposal_id.to_string());
                            intent.updated_at = now;
                        }
                        events::emit(
                            doc,
                            &self.signing_key,
                            "intent.reserved",
                            &events::cycle_correlation_id(proposal_id),
                            &format!("{intent_id}|reserved|{commit_id}"),
                            participant.actor.clone(),
                            now,
                            serde_json::json!({ "intent_id": intent_id, "commit_id": commit_id }),
                        );
                    }

                    let commit = doc.commits.get_mut(&commit_id).expect("just inserted or already present");
                    commit
                        .acceptances
                        .insert(intent_id.to_string(), Acceptance { actor: participant.actor.clone(), accepted_at: now });
                    commit.updated_at = now;
                    if commit.is_ready() {
                        commit.phase = CommitPhase::Ready;
                    }
                }

                Ok(doc.commits.get(&commit_id).expect("commit present").clone())
            })
            .await
    }

    /// Decline a proposal. If no commit has been materialized yet (nobody
    /// has accepted), this is a no-op: nothing is reserved yet, so there is
    /// nothing to release and no event to emit.
    pub async fn decline(&self, proposal_id: &str, now: DateTime<Utc>) -> DomainResult<Option<Commit>> {
        self.store
            .write(|doc| {
                let commit_id = Commit::derive_id(proposal_id);
                let Some(existing) = doc.commits.get(&commit_id) else {
                    return Ok(None);
                };
                if existing.phase.is_terminal() {
                    return Ok(Some(existing.clone()));
                }

                let participant_ids = existing.participant_intent_ids.clone();
                for intent_id in &participant_ids {
                    if doc.reservations.remove(intent_id).is_some() {
                        let owner = doc.intents.get(intent_id).map(|i| i.owner.clone());
                        if let Some(intent) = doc.intents.get_mut(intent_id) {
                            intent.status = IntentStatus::Active;
                            intent.reserved_proposal_id = None;
                            intent.updated_at = now;
                        }
                        if let Some(owner) = owner {
                            events::emit(
                                doc,
                                &self.signing_key,
                                "intent.unreserved",
                                &events::cycle_correlation_id(proposal_id),
                                &format!("{intent_id}|declined"),
                                owner,
                                now,
                                serde_json::json!({ "intent_id": intent_id, "reason": "declined" }),
                            );
                        }
                    }
                }

                let commit = doc.commits.get_mut(&commit_id).expect("checked present above");
                commit.phase = CommitPhase::Declined;
                commit.updated_at = now;
                Ok(Some(commit.clone()))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use swapgraph_core::{ParticipantEntry, ValueBand, WantClause, WantSpec, TrustConstraints, TimeConstraints, Urgency, SettlementPreferences, AssetRef};

    fn seed_intent(id: &str, owner: Actor, now: DateTime<Utc>) -> swapgraph_core::SwapIntent {
        swapgraph_core::SwapIntent {
            id: id.to_string(),
            owner,
            offer: vec![AssetRef { platform: "steam".into(), asset_id: "x".into(), class: "knife".into(), instance: None, value_usd: 100.0, inventory_snapshot_proof_ref: None }],
            want_spec: WantSpec { any_of: vec![WantClause::SpecificAsset { platform: "steam".into(), asset_key: "y".into() }] },
            value_band: ValueBand { min_usd: 1.0, max_usd: 1000.0, pricing_source: "test".into() },
            trust_constraints: TrustConstraints { max_cycle_length: 3, min_counterparty_reliability: 0.0 },
            time_constraints: TimeConstraints { expires_at: now + Duration::hours(1), urgency: Urgency::Normal },
            settlement_preferences: SettlementPreferences { require_escrow: true },
            status: IntentStatus::Active,
            reserved_proposal_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn seed_proposal(now: DateTime<Utc>) -> swapgraph_core::CycleProposal {
        swapgraph_core::CycleProposal {
            id: "proposal_1".to_string(),
            participants: vec![
                ParticipantEntry { intent_id: "intent_a".into(), actor: Actor::new(ActorType::User, "u1"), give: vec![], get: vec![] },
                ParticipantEntry { intent_id: "intent_b".into(), actor: Actor::new(ActorType::User, "u2"), give: vec![], get: vec![] },
            ],
            confidence_score: 0.9,
            value_spread: 0.0,
            explainability: vec![],
            expires_at: now + Duration::hours(1),
        }
    }

    async fn service_with_proposal() -> (CommitService, DateTime<Utc>) {
        let store = Arc::new(StateStore::new());
        let now = Utc::now();
        store
            .write(|doc| {
                doc.proposals.insert("proposal_1".to_string(), seed_proposal(now));
                doc.intents.insert("intent_a".to_string(), seed_intent("intent_a", Actor::new(ActorType::User, "u1"), now));
                doc.intents.insert("intent_b".to_string(), seed_intent("intent_b", Actor::new(ActorType::User, "u2"), now));
            })
            .await;
        (CommitService::new(store, SigningKey::new("k1", b"secret".to_vec())), now)
    }

    #[tokio::test]
    async fn first_accept_materializes_pending_commit_and_reserves_intent() {
        let (svc, now) = service_with_proposal().await;
        let commit = svc.accept("proposal_1", "intent_a", &Actor::new(ActorType::User, "u1"), None, now).await.unwrap();
        assert_eq!(commit.phase, CommitPhase::Pending);
        assert_eq!(commit.acceptances.len(), 1);
    }

    #[tokio::test]
    async fn commit_becomes_ready_once_all_participants_accept() {
        let (svc, now) = service_with_proposal().await;
        svc.accept("proposal_1", "intent_a", &Actor::new(ActorType::User, "u1"), None, now).await.unwrap();
        let commit = svc.accept("proposal_1", "intent_b", &Actor::new(ActorType::User, "u2"), None, now).await.unwrap();
        assert_eq!(commit.phase, CommitPhase::Ready);
    }

    #[tokio::test]
    async fn accept_by_non_owner_is_forbidden() {
        let (svc, now) = service_with_proposal().await;
        let err = svc.accept("proposal_1", "intent_a", &Actor::new(ActorType::User, "someone_else"), None, now).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn decline_before_any_acceptance_is_a_no_op() {
        let (svc, now) = service_with_proposal().await;
        let result = svc.decline("proposal_1", now).await.unwrap();
        assert!(result.is_none());
        let events = svc.store.read(|doc| doc.events.len()).await;
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn decline_after_acceptance_releases_reservations() {
        let (svc, now) = service_with_proposal().await;
        svc.accept("proposal_1", "intent_a", &Actor::new(ActorType::User, "u1"), None, now).await.unwrap();
        let declined = svc.decline("proposal_1", now).await.unwrap().unwrap();
        assert_eq!(declined.phase, CommitPhase::Declined);
        let reserved = svc.store.read(|doc| doc.reservations.contains_key("intent_a")).await;
        assert!(!reserved);
    }
}
