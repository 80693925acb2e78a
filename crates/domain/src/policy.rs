//! Agent delegation policy checks applied to commit acceptance (§4.7).
//!
//! An agent actor may only accept a proposal on a subject's behalf within
//! the bounds of its `Delegation`: the proposal's cycle length and
//! confidence must clear the delegation's `TradingPolicy`, and the
//! acceptance instant must fall outside any configured quiet-hours window.

use chrono::{DateTime, Utc};
use swapgraph_core::{CycleProposal, Delegation, DomainError, DomainResult};

pub fn evaluate_proposal_against_trading_policy(proposal: &CycleProposal, delegation: &Delegation) -> DomainResult<()> {
    let policy = &delegation.policy;
    let cycle_length = proposal.participants.len() as u8;
    if cycle_length > policy.max_cycle_length {
        return Err(DomainError::forbidden(format!(
            "proposal cycle length {cycle_length} exceeds delegation max_cycle_length {}",
            policy.max_cycle_length
        )));
    }
    if proposal.confidence_score < policy.min_confidence {
        return Err(DomainError::forbidden(format!(
            "proposal confidence {} is below delegation min_confidence {}",
            proposal.confidence_score, policy.min_confidence
        )));
    }
    Ok(())
}

pub fn evaluate_quiet_hours_policy(delegation: &Delegation, at: DateTime<Utc>) -> DomainResult<()> {
    if let Some(window) = &delegation.policy.quiet_hours {
        if window.contains(at) {
            return Err(DomainError::forbidden("delegation quiet hours window is active"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use swapgraph_core::{Actor, ActorType, ParticipantEntry, QuietHoursWindow, TradingPolicy};

    fn proposal(cycle_length: usize, confidence: f64) -> CycleProposal {
        CycleProposal {
            id: "proposal_x".to_string(),
            participants: (0..cycle_length)
                .map(|i| ParticipantEntry {
                    intent_id: format!("intent_{i}"),
                    actor: Actor::new(ActorType::User, format!("u{i}")),
                    give: vec![],
                    get: vec![],
                })
                .collect(),
            confidence_score: confidence,
            value_spread: 0.0,
            explainability: vec![],
            expires_at: Utc::now(),
        }
    }

    fn delegation(max_cycle_length: u8, min_confidence: f64) -> Delegation {
        Delegation {
            subject: Actor::new(ActorType::User, "u0"),
            policy: TradingPolicy { max_cycle_length, min_confidence, quiet_hours: None },
        }
    }

    #[test]
    fn rejects_cycle_longer_than_delegation_allows() {
        let p = proposal(3, 0.9);
        let d = delegation(2, 0.0);
        assert!(evaluate_proposal_against_trading_policy(&p, &d).is_err());
    }

    #[test]
    fn rejects_confidence_below_floor() {
        let p = proposal(2, 0.4);
        let d = delegation(3, 0.5);
        assert!(evaluate_proposal_against_trading_policy(&p, &d).is_err());
    }

    #[test]
    fn quiet_hours_blocks_acceptance_inside_window() {
        let mut d = delegation(3, 0.0);
        d.policy.quiet_hours = Some(QuietHoursWindow { time_zone: "UTC".to_string(), start_hour: 22, end_hour: 6 });
        let during = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        assert!(evaluate_quiet_hours_policy(&d, during).is_err());
    }
}
