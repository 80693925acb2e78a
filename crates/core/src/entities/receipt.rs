//! `Receipt` — the signed terminal-state record of a timeline (§3, §4.8).

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash;
use crate::signing::Signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptFinalState {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transparency {
    pub reason_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub cycle_id: String,
    pub final_state: ReceiptFinalState,
    /// Participating intent ids, sorted.
    pub intent_ids: Vec<String>,
    /// Asset ids, deduplicated and sorted.
    pub asset_ids: Vec<String>,
    pub transparency: Option<Transparency>,
    pub signature: Option<Signature>,
}

#[derive(Serialize)]
struct ReceiptIdKey<'a> {
    cycle_id: &'a str,
    final_state: ReceiptFinalState,
}

impl Receipt {
    /// `id = hash of (cycle_id, final_state)` — depends on nothing else.
    pub fn derive_id(cycle_id: &str, final_state: ReceiptFinalState) -> String {
        let digest = canonical_hash(&ReceiptIdKey { cycle_id, final_state })
            .expect("receipt id key always canonicalizes");
        format!("rcpt_{}", digest.to_hex())
    }

    /// The canonical form signed over — everything except `signature`.
    pub fn signable(&self) -> SignableReceipt<'_> {
        SignableReceipt {
            id: &self.id,
            cycle_id: &self.cycle_id,
            final_state: self.final_state,
            intent_ids: &self.intent_ids,
            asset_ids: &self.asset_ids,
            transparency: self.transparency.as_ref(),
        }
    }
}

#[derive(Serialize)]
pub struct SignableReceipt<'a> {
    pub id: &'a str,
    pub cycle_id: &'a str,
    pub final_state: ReceiptFinalState,
    pub intent_ids: &'a [String],
    pub asset_ids: &'a [String],
    pub transparency: Option<&'a Transparency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_id_depends_only_on_cycle_and_state() {
        let a = Receipt::derive_id("cyc_1", ReceiptFinalState::Completed);
        let b = Receipt::derive_id("cyc_1", ReceiptFinalState::Completed);
        assert_eq!(a, b);
        let c = Receipt::derive_id("cyc_1", ReceiptFinalState::Failed);
        assert_ne!(a, c);
        let d = Receipt::derive_id("cyc_2", ReceiptFinalState::Completed);
        assert_ne!(a, d);
    }
}
