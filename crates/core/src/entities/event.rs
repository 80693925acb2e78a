//! `EventEnvelope` — the signed, append-only event log entry (§3, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::Actor;
use crate::canonical::canonical_hash;
use crate::signing::Signature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: String,
    pub actor: Actor,
    pub payload: Value,
    pub signature: Option<Signature>,
    /// Monotone append sequence number assigned by the store.
    pub sequence: u64,
}

#[derive(Serialize)]
struct EventIdKey<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    correlation_id: &'a str,
    dedup_key: &'a str,
}

impl EventEnvelope {
    /// `stableEventId(type, correlation_id, dedup_key)` — deterministic so
    /// replays under idempotent retry produce identical ids.
    pub fn stable_event_id(event_type: &str, correlation_id: &str, dedup_key: &str) -> String {
        let digest = canonical_hash(&EventIdKey { event_type, correlation_id, dedup_key })
            .expect("event id key always canonicalizes");
        format!("evt_{}", digest.to_hex())
    }

    pub fn signable(&self) -> SignableEvent<'_> {
        SignableEvent {
            event_id: &self.event_id,
            event_type: &self.event_type,
            occurred_at: self.occurred_at,
            correlation_id: &self.correlation_id,
            actor: &self.actor,
            payload: &self.payload,
        }
    }
}

#[derive(Serialize)]
pub struct SignableEvent<'a> {
    pub event_id: &'a str,
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: &'a str,
    pub actor: &'a Actor,
    pub payload: &'a Value,
}
