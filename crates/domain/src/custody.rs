//! Custody service (C9): snapshot publication and Merkle inclusion proofs.
//!
//! The tree is rebuilt from a snapshot's sorted holdings on demand rather
//! than stored node-by-node; proof requests are infrequent relative to
//! publication and the document already carries the authoritative
//! sorted-holdings order the build is deterministic over.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use swapgraph_core::canonical::{canonical_hash, hash_pair, Sha256Digest};
use swapgraph_core::{Actor, ActorType, CustodySnapshot, DomainError, DomainResult, Holding, InclusionProof, SiblingHash, SiblingPosition};
use swapgraph_store::StateStore;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

#[derive(Clone)]
pub struct CustodyService {
    store: Arc<StateStore>,
}

#[derive(Serialize)]
struct LeafInput<'a> {
    snapshot_id: &'a str,
    holding: &'a Holding,
}

fn leaf_hash(snapshot_id: &str, holding: &Holding) -> Sha256Digest {
    canonical_hash(&LeafInput { snapshot_id, holding }).expect("a holding always canonicalizes")
}

/// Bottom-up levels of the balanced binary Merkle tree; `levels[0]` is the
/// leaf layer, `levels.last()` is the single-node root layer. An odd node
/// at a level is paired with itself (§4.9).
fn build_levels(leaves: Vec<Sha256Digest>) -> Vec<Vec<Sha256Digest>> {
    let mut levels = vec![leaves];
    while levels.last().expect("levels is never empty").len() > 1 {
        let current = levels.last().expect("just checked non-empty");
        let mut next = Vec::with_capacity((current.len() + 1) / 2);
        let mut i = 0;
        while i < current.len() {
            let left = current[i];
            let right = if i + 1 < current.len() { current[i + 1] } else { current[i] };
            next.push(hash_pair(left, right));
            i += 2;
        }
        levels.push(next);
    }
    levels
}

impl CustodyService {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub async fn publish_snapshot(
        &self,
        actor: &Actor,
        snapshot_id: &str,
        mut holdings: Vec<Holding>,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<CustodySnapshot> {
        if actor.actor_type != ActorType::Partner {
            return Err(DomainError::forbidden("only a partner actor may publish a custody snapshot"));
        }

        holdings.sort_by(|a, b| a.holding_key().cmp(&b.holding_key()));
        let root_hash = if holdings.is_empty() {
            Sha256Digest::from_bytes([0u8; 32]).to_hex()
        } else {
            let leaves: Vec<Sha256Digest> = holdings.iter().map(|h| leaf_hash(snapshot_id, h)).collect();
            build_levels(leaves).last().expect("at least one level")[0].to_hex()
        };

        let snapshot = CustodySnapshot {
            snapshot_id: snapshot_id.to_string(),
            recorded_at,
            leaf_count: holdings.len(),
            root_hash,
            holdings,
        };

        self.store
            .write(|doc| {
                if doc.vault_custody_snapshots.contains_key(snapshot_id) {
                    return Err(DomainError::constraint_violation("vault_custody_snapshot_exists"));
                }
                doc.vault_custody_snapshots.insert(snapshot_id.to_string(), snapshot.clone());
                Ok(snapshot.clone())
            })
            .await
    }

    pub async fn get_inclusion_proof(&self, snapshot_id: &str, holding_id: &str) -> DomainResult<InclusionProof> {
        let snapshot = self.get_snapshot(snapshot_id).await?;
        let leaf_index = snapshot
            .holdings
            .iter()
            .position(|h| h.holding_id == holding_id)
            .ok_or_else(|| DomainError::not_found(format!("holding {holding_id} not found in snapshot {snapshot_id}")))?;

        let leaves: Vec<Sha256Digest> = snapshot.holdings.iter().map(|h| leaf_hash(snapshot_id, h)).collect();
        let levels = build_levels(leaves);

        let mut siblings = Vec::new();
        let mut idx = leaf_index;
        for level in levels.iter().take(levels.len().saturating_sub(1)) {
            if idx % 2 == 0 {
                let sibling = if idx + 1 < level.len() { level[idx + 1] } else { level[idx] };
                siblings.push(SiblingHash { position: SiblingPosition::Right, hash: sibling.to_hex() });
            } else {
                siblings.push(SiblingHash { position: SiblingPosition::Left, hash: level[idx - 1].to_hex() });
            }
            idx /= 2;
        }

        Ok(InclusionProof { leaf_index, leaf_hash: levels[0][leaf_index].to_hex(), siblings })
    }

    pub async fn verify_inclusion_proof(
        &self,
        snapshot_id: &str,
        holding: &Holding,
        proof: &InclusionProof,
    ) -> DomainResult<()> {
        let snapshot = self.get_snapshot(snapshot_id).await?;
        let expected_leaf = leaf_hash(snapshot_id, holding);
        if expected_leaf.to_hex() != proof.leaf_hash {
            return Err(DomainError::constraint_violation("leaf_hash_mismatch"));
        }

        let mut current = expected_leaf;
        for sibling in &proof.siblings {
            let sibling_digest = parse_digest(&sibling.hash)
                .ok_or_else(|| DomainError::constraint_violation("invalid_sibling_position"))?;
            current = match sibling.position {
                SiblingPosition::Left => hash_pair(sibling_digest, current),
                SiblingPosition::Right => hash_pair(current, sibling_digest),
            };
        }

        if current.to_hex() != snapshot.root_hash {
            return Err(DomainError::constraint_violation("root_mismatch"));
        }
        Ok(())
    }

    pub async fn get_snapshot(&self, snapshot_id: &str) -> DomainResult<CustodySnapshot> {
        self.store
            .read(|doc| doc.vault_custody_snapshots.get(snapshot_id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found(format!("custody snapshot {snapshot_id} not found")))
    }

    pub async fn list_snapshots(
        &self,
        cursor_after: Option<&str>,
        limit: Option<usize>,
    ) -> DomainResult<(Vec<CustodySnapshot>, Option<String>)> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        self.store
            .read(|doc| {
                let mut ids: Vec<&String> = doc.vault_custody_snapshots.keys().collect();
                ids.sort();

                let start = match cursor_after {
                    None => 0,
                    Some(cursor) => {
                        let position = ids
                            .iter()
                            .position(|id| id.as_str() == cursor)
                            .ok_or_else(|| DomainError::constraint_violation("vault_custody_cursor_not_found"))?;
                        position + 1
                    }
                };

                let page: Vec<CustodySnapshot> = ids[start..]
                    .iter()
                    .take(limit)
                    .map(|id| doc.vault_custody_snapshots.get(*id).expect("id came from this map").clone())
                    .collect();
                let next_cursor = if start + page.len() < ids.len() {
                    page.last().map(|s| s.snapshot_id.clone())
                } else {
                    None
                };
                Ok((page, next_cursor))
            })
            .await
    }
}

fn parse_digest(hex_str: &str) -> Option<Sha256Digest> {
    let bytes = hex::decode(hex_str).ok()?;
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(Sha256Digest::from_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(id: &str) -> Holding {
        Holding {
            holding_id: id.to_string(),
            platform: "steam".to_string(),
            asset_id: format!("asset_{id}"),
            owner_type: "user".to_string(),
            owner_id: "u1".to_string(),
            vault_id: "vault_1".to_string(),
            deposit_id: format!("dep_{id}"),
            metadata: serde_json::Value::Null,
        }
    }

    fn service() -> CustodyService {
        CustodyService::new(Arc::new(StateStore::new()))
    }

    #[tokio::test]
    async fn publish_rejects_non_partner_actor() {
        let svc = service();
        let err = svc
            .publish_snapshot(&Actor::new(ActorType::User, "u1"), "snap_1", vec![holding("h1")], Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn publish_rejects_duplicate_snapshot_id() {
        let svc = service();
        let partner = Actor::new(ActorType::Partner, "p1");
        svc.publish_snapshot(&partner, "snap_1", vec![holding("h1")], Utc::now()).await.unwrap();
        let err = svc.publish_snapshot(&partner, "snap_1", vec![holding("h2")], Utc::now()).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::ConstraintViolation);
    }

    #[tokio::test]
    async fn inclusion_proof_round_trips_for_five_holdings() {
        let svc = service();
        let partner = Actor::new(ActorType::Partner, "p1");
        let holdings: Vec<Holding> = (0..5).map(|i| holding(&format!("h{i}"))).collect();
        svc.publish_snapshot(&partner, "snap_1", holdings.clone(), Utc::now()).await.unwrap();

        for h in &holdings {
            let proof = svc.get_inclusion_proof("snap_1", &h.holding_id).await.unwrap();
            svc.verify_inclusion_proof("snap_1", h, &proof).await.unwrap();
        }
    }

    #[tokio::test]
    async fn tampered_sibling_hash_fails_root_mismatch() {
        let svc = service();
        let partner = Actor::new(ActorType::Partner, "p1");
        let holdings: Vec<Holding> = (0..5).map(|i| holding(&format!("h{i}"))).collect();
        svc.publish_snapshot(&partner, "snap_1", holdings.clone(), Utc::now()).await.unwrap();

        let target = &holdings[2];
        let mut proof = svc.get_inclusion_proof("snap_1", &target.holding_id).await.unwrap();
        let mut bytes = hex::decode(&proof.siblings[0].hash).unwrap();
        bytes[0] ^= 0xFF;
        proof.siblings[0].hash = hex::encode(bytes);

        let err = svc.verify_inclusion_proof("snap_1", target, &proof).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::ConstraintViolation);
        assert_eq!(err.message, "root_mismatch");
    }

    #[tokio::test]
    async fn list_snapshots_paginates_forward_with_cursor() {
        let svc = service();
        let partner = Actor::new(ActorType::Partner, "p1");
        for i in 0..3 {
            svc.publish_snapshot(&partner, &format!("snap_{i}"), vec![holding("h1")], Utc::now()).await.unwrap();
        }
        let (page, cursor) = svc.list_snapshots(None, Some(2)).await.unwrap();
        assert_eq!(page.len(), 2);
        let cursor = cursor.unwrap();
        let (page2, cursor2) = svc.list_snapshots(Some(&cursor), Some(2)).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert!(cursor2.is_none());
    }

    #[tokio::test]
    async fn list_snapshots_rejects_unknown_cursor() {
        let svc = service();
        let err = svc.list_snapshots(Some("missing"), None).await.unwrap_err();
        assert_eq!(err.code, swapgraph_core::ErrorCode::ConstraintViolation);
    }
}
