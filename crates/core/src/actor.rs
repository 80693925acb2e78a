//! Actor identity and agent delegation (§3).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The kind of actor issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Partner,
    Agent,
}

impl ActorType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Some(ActorType::User),
            "partner" => Some(ActorType::Partner),
            "agent" => Some(ActorType::Agent),
            _ => None,
        }
    }

    /// The lowercase wire form used in headers and serialized scope keys —
    /// the same mapping `#[serde(rename_all = "lowercase")]` produces.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Partner => "partner",
            ActorType::Agent => "agent",
        }
    }
}

/// `(type, id)` identity of an actor in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub id: String,
}

impl Actor {
    pub fn new(actor_type: ActorType, id: impl Into<String>) -> Self {
        Self { actor_type, id: id.into() }
    }

    pub fn scope_key(&self) -> String {
        format!("{}|{}", self.actor_type.as_str(), self.id)
    }
}

/// An optional window, expressed in an IANA time zone, during which an
/// agent's delegation refuses to trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHoursWindow {
    /// IANA time zone name, e.g. "America/New_York".
    pub time_zone: String,
    /// Local start hour, 0..24, inclusive.
    pub start_hour: u8,
    /// Local end hour, 0..24, exclusive. May wrap past midnight
    /// (`start_hour > end_hour` means the window spans midnight).
    pub end_hour: u8,
}

impl QuietHoursWindow {
    /// Whether `at` (an absolute instant) falls inside the quiet-hours
    /// window once projected into the configured time zone.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let Ok(tz): Result<Tz, _> = self.time_zone.parse() else {
            // An unparsable zone can never be satisfied; fail closed by
            // treating every instant as inside quiet hours so a malformed
            // delegation can't silently bypass the policy.
            return true;
        };
        let local_hour = at.with_timezone(&tz).format("%H").to_string();
        let hour: u8 = local_hour.parse().unwrap_or(0);

        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Bounds an agent's delegation is permitted to trade within.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingPolicy {
    pub max_cycle_length: u8,
    pub min_confidence: f64,
    pub quiet_hours: Option<QuietHoursWindow>,
}

/// Carries an acting agent's authority to trade on behalf of a subject actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub subject: Actor,
    pub policy: TradingPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_actor_type_case_insensitively() {
        assert_eq!(ActorType::parse("Partner"), Some(ActorType::Partner));
        assert_eq!(ActorType::parse("bogus"), None);
    }

    #[test]
    fn quiet_hours_window_simple_range() {
        let window = QuietHoursWindow {
            time_zone: "UTC".to_string(),
            start_hour: 22,
            end_hour: 6,
        };
        let during = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(window.contains(during));
        assert!(!window.contains(outside));
    }

    #[test]
    fn quiet_hours_window_non_wrapping() {
        let window = QuietHoursWindow {
            time_zone: "UTC".to_string(),
            start_hour: 9,
            end_hour: 17,
        };
        let during = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        assert!(window.contains(during));
        assert!(!window.contains(outside));
    }
}
