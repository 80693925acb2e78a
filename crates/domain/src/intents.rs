//! Intent service (C6): CRUD, validation, and the reservation interlock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use swapgraph_core::{Actor, ActorType, DomainError, DomainResult, IntentStatus, SigningKey, SwapIntent};
use swapgraph_store::StateStore;

use crate::events;

#[derive(Clone)]
pub struct IntentService {
    store: Arc<StateStore>,
    signing_key: SigningKey,
}

/// The caller-supplied fields of a new intent; everything else (id,
/// status, timestamps) is assigned by the service.
pub struct CreateIntentRequest {
    pub id: String,
    pub owner: Actor,
    pub offer: Vec<swapgraph_core::AssetRef>,
    pub want_spec: swapgraph_core::WantSpec,
    pub value_band: swapgraph_core::ValueBand,
    pub trust_constraints: swapgraph_core::TrustConstraints,
    pub time_constraints: swapgraph_core::TimeConstraints,
    pub settlement_preferences: swapgraph_core::SettlementPreferences,
}

/// PATCH fields; `None` leaves the existing value untouched.
#[derive(Default)]
pub struct UpdateIntentRequest {
    pub offer: Option<Vec<swapgraph_core::AssetRef>>,
    pub want_spec: Option<swapgraph_core::WantSpec>,
    pub value_band: Option<swapgraph_core::ValueBand>,
    pub trust_constraints: Option<swapgraph_core::TrustConstraints>,
    pub time_constraints: Option<swapgraph_core::TimeConstraints>,
    pub settlement_preferences: Option<swapgraph_core::SettlementPreferences>,
}

impl IntentService {
    pub fn new(store: Arc<StateStore>, signing_key: SigningKey) -> Self {
        Self { store, signing_key }
    }

    pub async fn create(&self, req: CreateIntentRequest, now: DateTime<Utc>) -> DomainResult<SwapIntent> {
        validate_actor_type(&req.owner)?;
        validate_value_band(&req.value_band)?;
        validate_want_spec(&req.want_spec)?;
        validate_offer(&req.offer)?;
        if req.time_constraints.expires_at <= now {
            return Err(DomainError::schema_invalid("time_constraints.expires_at must be in the future"));
        }

        let intent = SwapIntent {
            id: req.id,
            owner: req.owner,
            offer: req.offer,
            want_spec: req.want_spec,
            value_band: req.value_band,
            trust_constraints: req.trust_constraints,
            time_constraints: req.time_constraints,
            settlement_preferences: req.settlement_preferences,
            status: IntentStatus::Active,
            reserved_proposal_id: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .write(|doc| {
                doc.intents.insert(intent.id.clone(), intent.clone());
            })
            .await;

        Ok(intent)
    }

    pub async fn get(&self, id: &str) -> DomainResult<SwapIntent> {
        self.store
            .read(|doc| doc.intents.get(id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found(format!("swap intent {id} not found")))
    }

    pub async fn list_by_actor(&self, owner: &Actor) -> Vec<SwapIntent> {
        self.store.read(|doc| doc.intents.values().filter(|i| &i.owner == owner).cloned().collect()).await
    }

    pub async fn update(&self, id: &str, req: UpdateIntentRequest, now: DateTime<Utc>) -> DomainResult<SwapIntent> {
        if let Some(ref value_band) = req.value_band {
            validate_value_band(value_band)?;
        }
        if let Some(ref want_spec) = req.want_spec {
            validate_want_spec(want_spec)?;
        }
        if let Some(ref offer) = req.offer {
            validate_offer(offer)?;
        }

        self.store
            .write(|doc| {
                let intent = doc
                    .intents
                    .get_mut(id)
                    .ok_or_else(|| DomainError::not_found(format!("swap intent {id} not found")))?;
                if intent.status == IntentStatus::Reserved {
                    return Err(DomainError::conflict("cannot update an intent while it is reserved"));
                }
                if let Some(offer) = req.offer {
                    intent.offer = offer;
                }
                if let Some(want_spec) = req.want_spec {
                    intent.want_spec = want_spec;
                }
                if let Some(value_band) = req.value_band {
                    intent.value_band = value_band;
                }
                if let Some(trust_constraints) = req.trust_constraints {
                    intent.trust_constraints = trust_constraints;
                }
                if let Some(time_constraints) = req.time_constraints {
                    intent.time_constraints = time_constraints;
                }
                if let Some(settlement_preferences) = req.settlement_preferences {
                    intent.settlement_preferences = settlement_preferences;
                }
                intent.updated_at = now;
                Ok(intent.clone())
            })
            .await
    }

    /// Transitions `active|reserved -> cancelled`. If the intent was
    /// reserved, the reservation is released and `intent.unreserved` is
    /// emitted with reason `cancelled`.
    pub async fn cancel(&self, id: &str, now: DateTime<Utc>) -> DomainResult<SwapIntent> {
        self.store
            .write(|doc| {
                let intent = doc
                    .intents
                    .get(id)
                    .ok_or_else(|| DomainError::not_found(format!("swap intent {id} not found")))?
                    .clone();
                if intent.status.is_terminal() {
                    return Err(DomainError::conflict(format!("intent {id} is already in a terminal state")));
                }

                let was_reserved = intent.status == IntentStatus::Reserved;
                let owner = intent.owner.clone();

                let stored = doc.intents.get_mut(id).expect("checked present above");
                stored.status = IntentStatus::Cancelled;
                stored.reserved_proposal_id = None;
                stored.updated_at = now;
                let result = stored.clone();

                if was_reserved {
                    doc.reservations.remove(id);
                    events::emit(
                        doc,
                        &self.signing_key,
                        "intent.unreserved",
                        id,
                        &format!("{id}|cancelled"),
                        owner,
                        now,
                        serde_json::json!({ "intent_id": id, "reason": "cancelled" }),
                    );
                }

                Ok(result)
            })
            .await
    }
}

fn validate_actor_type(actor: &Actor) -> DomainResult<()> {
    match actor.actor_type {
        ActorType::User | ActorType::Partner | ActorType::Agent => Ok(()),
    }
}

fn validate_value_band(band: &swapgraph_core::ValueBand) -> DomainResult<()> {
    if !band.is_finite_and_ordered() {
        return Err(DomainError::schema_invalid("value_band must be finite with min_usd <= max_usd"));
    }
    Ok(())
}

fn validate_want_spec(spec: &swapgraph_core::WantSpec) -> DomainResult<()> {
    if spec.any_of.is_empty() {
        return Err(DomainError::schema_invalid("want_spec.any_of must not be empty"));
    }
    Ok(())
}

fn validate_offer(offer: &[swapgraph_core::AssetRef]) -> DomainResult<()> {
    for asset in offer {
        if asset.asset_id.is_empty() {
            return Err(DomainError::schema_invalid("offer asset_id must not be empty"));
        }
        if asset.class.is_empty() {
            return Err(DomainError::schema_invalid("offer asset class/instance must not be empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use swapgraph_core::{AssetRef, SettlementPreferences, TimeConstraints, TrustConstraints, Urgency, ValueBand, WantClause, WantSpec};

    fn service() -> IntentService {
        IntentService::new(Arc::new(StateStore::new()), SigningKey::new("k1", b"secret".to_vec()))
    }

    fn valid_request(id: &str, now: DateTime<Utc>) -> CreateIntentRequest {
        CreateIntentRequest {
            id: id.to_string(),
            owner: Actor::new(ActorType::User, "u1"),
            offer: vec![AssetRef {
                platform: "steam".into(),
                asset_id: "x".into(),
                class: "knife".into(),
                instance: None,
                value_usd: 100.0,
                inventory_snapshot_proof_ref: None,
            }],
            want_spec: WantSpec {
                any_of: vec![WantClause::SpecificAsset { platform: "steam".into(), asset_key: "y".into() }],
            },
            value_band: ValueBand { min_usd: 80.0, max_usd: 120.0, pricing_source: "test".into() },
            trust_constraints: TrustConstraints { max_cycle_length: 3, min_counterparty_reliability: 0.0 },
            time_constraints: TimeConstraints { expires_at: now + Duration::hours(1), urgency: Urgency::Normal },
            settlement_preferences: SettlementPreferences { require_escrow: true },
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_want_spec() {
        let svc = service();
        let now = Utc::now();
        let mut req = valid_request("intent_1", now);
        req.want_spec.any_of.clear();
        let err = svc.create(req, now).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::SchemaInvalid);
    }

    #[tokio::test]
    async fn cancel_releases_reservation_and_emits_event() {
        let svc = service();
        let now = Utc::now();
        let req = valid_request("intent_1", now);
        svc.create(req, now).await.unwrap();
        svc.store
            .write(|doc| {
                let intent = doc.intents.get_mut("intent_1").unwrap();
                intent.status = IntentStatus::Reserved;
                intent.reserved_proposal_id = Some("commit_x".to_string());
                doc.reservations.insert("intent_1".to_string(), "commit_x".to_string());
            })
            .await;

        let cancelled = svc.cancel("intent_1", now).await.unwrap();
        assert_eq!(cancelled.status, IntentStatus::Cancelled);
        let still_reserved = svc.store.read(|doc| doc.reservations.contains_key("intent_1")).await;
        assert!(!still_reserved);
        let emitted = svc.store.read(|doc| doc.events.len()).await;
        assert_eq!(emitted, 1);
    }

    #[tokio::test]
    async fn update_of_reserved_intent_fails_with_conflict() {
        let svc = service();
        let now = Utc::now();
        let req = valid_request("intent_1", now);
        svc.create(req, now).await.unwrap();
        svc.store.write(|doc| doc.intents.get_mut("intent_1").unwrap().status = IntentStatus::Reserved).await;

        let err = svc.update("intent_1", UpdateIntentRequest::default(), now).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::Conflict);
    }
}
