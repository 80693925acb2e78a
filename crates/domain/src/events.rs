//! Envelope construction on top of the append-only log (C10).

use chrono::{DateTime, Utc};
use serde_json::Value;
use swapgraph_core::{Actor, EventEnvelope, SigningKey};
use swapgraph_store::document::Document;

/// Build, sign, and append one event envelope. `dedup_key` feeds
/// `stable_event_id` so replays under idempotent retry land on the same id
/// (§4.10); the store's `append` then folds duplicate ids into a no-op.
pub fn emit(
    doc: &mut Document,
    signing_key: &SigningKey,
    event_type: &str,
    correlation_id: &str,
    dedup_key: &str,
    actor: Actor,
    occurred_at: DateTime<Utc>,
    payload: Value,
) -> EventEnvelope {
    let event_id = EventEnvelope::stable_event_id(event_type, correlation_id, dedup_key);
    let mut envelope = EventEnvelope {
        event_id,
        event_type: event_type.to_string(),
        occurred_at,
        correlation_id: correlation_id.to_string(),
        actor,
        payload,
        signature: None,
        sequence: 0,
    };
    let signature = signing_key.sign(&envelope.signable()).expect("event envelope always canonicalizes");
    envelope.signature = Some(signature);
    swapgraph_store::events::append(doc, envelope)
}

/// `corr_<cycle_id>` — the correlation id settlement events share (§4.10).
pub fn cycle_correlation_id(cycle_id: &str) -> String {
    format!("corr_{cycle_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapgraph_core::ActorType;

    #[test]
    fn replayed_dedup_key_returns_the_same_envelope() {
        let mut doc = Document::new();
        let key = SigningKey::new("k1", b"secret".to_vec());
        let now = Utc::now();
        let actor = Actor::new(ActorType::Partner, "p1");
        let a = emit(&mut doc, &key, "intent.reserved", "corr_1", "intent_1", actor.clone(), now, serde_json::json!({}));
        let b = emit(&mut doc, &key, "intent.reserved", "corr_1", "intent_1", actor, now, serde_json::json!({}));
        assert_eq!(a.event_id, b.event_id);
        assert_eq!(doc.events.len(), 1);
    }
}
