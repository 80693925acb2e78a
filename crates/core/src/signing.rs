//! Keyed-MAC signing for event envelopes and receipts (C2).
//!
//! Every signable value is signed over its canonical form with its
//! `signature` field excluded. The MAC is HMAC-SHA256 over a configured
//! secret; the signature carries a `key_id` so a future key rotation is
//! representable in the wire format even though rotation itself is out of
//! scope here.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::canonical::{canonical_bytes, CanonicalError};

type HmacSha256 = Hmac<Sha256>;

/// A detached signature attached to an `EventEnvelope` or `Receipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub key_id: String,
    pub mac: String,
}

/// The symmetric key used to sign and verify envelopes/receipts.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    secret: Vec<u8>,
}

impl SigningKey {
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign the canonical form of `value` (a `Serialize` type whose
    /// `signature`-bearing variant must already have its `signature` field
    /// set to `None`/omitted before calling this).
    pub fn sign<T: Serialize>(&self, value: &T) -> Result<Signature, CanonicalError> {
        let bytes = canonical_bytes(value)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(&bytes);
        let tag = mac.finalize().into_bytes();
        Ok(Signature {
            key_id: self.key_id.clone(),
            mac: hex::encode(tag),
        })
    }

    /// Verify that `signature` is a valid MAC over the canonical form of
    /// `value` under this key. Returns `false` on key-id mismatch too,
    /// since a signature produced under a different key cannot verify here.
    pub fn verify<T: Serialize>(&self, value: &T, signature: &Signature) -> bool {
        if signature.key_id != self.key_id {
            return false;
        }
        let Ok(expected) = self.sign(value) else {
            return false;
        };
        constant_time_eq(expected.mac.as_bytes(), signature.mac.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Payload {
        a: u32,
        b: String,
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let key = SigningKey::new("k1", b"super-secret".to_vec());
        let payload = Payload { a: 1, b: "x".into() };
        let sig = key.sign(&payload).unwrap();
        assert_eq!(sig.key_id, "k1");
        assert!(key.verify(&payload, &sig));
    }

    #[test]
    fn tampering_breaks_verification() {
        let key = SigningKey::new("k1", b"super-secret".to_vec());
        let payload = Payload { a: 1, b: "x".into() };
        let sig = key.sign(&payload).unwrap();
        let tampered = Payload { a: 2, b: "x".into() };
        assert!(!key.verify(&tampered, &sig));
    }

    #[test]
    fn wrong_key_id_fails_verification() {
        let key = SigningKey::new("k1", b"super-secret".to_vec());
        let other = SigningKey::new("k2", b"super-secret".to_vec());
        let payload = Payload { a: 1, b: "x".into() };
        let sig = key.sign(&payload).unwrap();
        assert!(!other.verify(&payload, &sig));
    }
}
