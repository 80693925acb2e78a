//! SwapGraph core: canonical JSON + hashing, signing primitives, the shared
//! entity types of the data model, and the closed error taxonomy.
//!
//! Every other crate in this workspace depends on this one and nothing
//! lower; it has no knowledge of storage, HTTP, or the matching algorithm.

pub mod actor;
pub mod canonical;
pub mod entities;
pub mod error;
pub mod signing;

pub use actor::{Actor, ActorType, Delegation, QuietHoursWindow, TradingPolicy};
pub use canonical::{canonical_bytes, canonical_hash, canonicalize, hash_pair, sha256, Sha256Digest};
pub use entities::*;
pub use error::{DomainError, DomainResult, ErrorCode};
pub use signing::{Signature, SigningKey};
