//! Diagnostics emitted by a matching run (§4.5 step 4, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchStats {
    pub candidate_cycles: usize,
    pub candidate_proposals: usize,
    pub selected_proposals: usize,
    pub intents_active: usize,
    pub edges: usize,
    pub cycle_enumeration_limited: bool,
    pub cycle_enumeration_timed_out: bool,
}
