//! Canonical JSON serialization and SHA-256 based stable hashing.
//!
//! Canonicalization sorts object keys lexicographically, preserves array
//! order, and rejects non-finite numbers. The canonical byte form is the
//! input to every stable ID in the system (receipt ids, event ids, payload
//! hashes, Merkle leaf/interior hashes).

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest, rendered as lowercase hex wherever it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First `n` hex characters, used for short deterministic IDs
    /// (e.g. `commit_<12-hex>`).
    pub fn short_hex(self, n: usize) -> String {
        let full = self.to_hex();
        full[..n.min(full.len())].to_string()
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    #[error("non-finite number encountered during canonicalization")]
    NonFiniteNumber,
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Canonicalize an arbitrary `Value`: sort object keys recursively,
/// leave arrays in their given order, and reject NaN/Infinity (which
/// cannot even be represented in `serde_json::Number`, so this is really
/// a defense against the `arbitrary_precision` feature being enabled
/// transitively; kept explicit so the contract is visible in code).
pub fn canonicalize(value: &Value) -> Result<Value, CanonicalError> {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                let v = canonicalize(&map[key])?;
                sorted.insert(key.clone(), v);
            }
            Ok(Value::Object(sorted))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(canonicalize(item)?);
            }
            Ok(Value::Array(out))
        }
        Value::Number(n) => {
            if n.as_f64().map(|f| f.is_finite()).unwrap_or(false) {
                Ok(Value::Number(n.clone()))
            } else {
                Err(CanonicalError::NonFiniteNumber)
            }
        }
        other => Ok(other.clone()),
    }
}

/// Serialize `value` to its canonical byte form (sorted keys, compact,
/// no trailing whitespace).
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let raw = serde_json::to_value(value).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    let sorted = canonicalize(&raw)?;
    serde_json::to_vec(&sorted).map_err(|e| CanonicalError::Serialize(e.to_string()))
}

/// SHA-256 of the canonical byte form of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<Sha256Digest, CanonicalError> {
    let bytes = canonical_bytes(value)?;
    Ok(sha256(&bytes))
}

pub fn sha256(bytes: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Sha256Digest::from_bytes(out)
}

/// `hashPair(L, R)` = SHA-256 of the canonical JSON object `{"left":L,"right":R}`.
/// Interior Merkle nodes must be built this way, never via raw byte
/// concatenation of the two hashes.
pub fn hash_pair(left: Sha256Digest, right: Sha256Digest) -> Sha256Digest {
    let obj = serde_json::json!({ "left": left.to_hex(), "right": right.to_hex() });
    // `obj` is already in sorted-key form (two keys, already alphabetical)
    // but we route through canonicalize() anyway so the contract holds even
    // if more fields are ever added here.
    let canon = canonicalize(&obj).expect("hash_pair payload is always finite JSON");
    let bytes = serde_json::to_vec(&canon).expect("hash_pair payload always serializes");
    sha256(&bytes)
}
