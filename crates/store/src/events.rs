//! Append-only event log operations (C10).

use swapgraph_core::EventEnvelope;

use crate::document::Document;

/// Append `envelope` to the log, assigning the next monotone sequence
/// number. If an event with the same `event_id` was already appended
/// (a replayed emission under idempotent retry), this is a no-op and the
/// previously appended envelope is returned instead — the log never
/// contains two entries for the same stable event id.
pub fn append(doc: &mut Document, mut envelope: EventEnvelope) -> EventEnvelope {
    if let Some(existing) = doc.events.iter().find(|e| e.event_id == envelope.event_id) {
        return existing.clone();
    }
    envelope.sequence = doc.next_event_sequence;
    doc.next_event_sequence += 1;
    doc.events.push(envelope.clone());
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use swapgraph_core::{Actor, ActorType};

    fn envelope(event_id: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: event_id.to_string(),
            event_type: "intent.reserved".to_string(),
            occurred_at: Utc::now(),
            correlation_id: "corr_1".to_string(),
            actor: Actor::new(ActorType::Partner, "p1"),
            payload: serde_json::json!({}),
            signature: None,
            sequence: 0,
        }
    }

    #[test]
    fn sequence_is_monotone() {
        let mut doc = Document::new();
        let a = append(&mut doc, envelope("evt_a"));
        let b = append(&mut doc, envelope("evt_b"));
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
    }

    #[test]
    fn replayed_event_id_does_not_duplicate() {
        let mut doc = Document::new();
        append(&mut doc, envelope("evt_a"));
        append(&mut doc, envelope("evt_a"));
        assert_eq!(doc.events.len(), 1);
    }
}
