//! `StateStore` — the single-writer transactional container (C3).
//!
//! Concurrency model (§5): one logical writer, serialized through a single
//! async mutex. Long CPU-bound work (matching) should call [`StateStore::snapshot`]
//! to clone the read set it needs, drop the lock, compute off to the side,
//! then reacquire via [`StateStore::write`] to commit results — never hold
//! the lock across an `.await` that isn't itself store I/O.

use tokio::sync::Mutex;

use crate::document::Document;

pub struct StateStore {
    inner: Mutex<Document>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Document::new()) }
    }

    pub fn from_document(document: Document) -> Self {
        Self { inner: Mutex::new(document) }
    }

    /// Run `f` holding the single writer lock. This is the only way any
    /// service mutates entities; every top-level write inside `f` lands or
    /// none does, because `f` runs to completion before the lock is
    /// released.
    pub async fn write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Document) -> R,
    {
        let mut doc = self.inner.lock().await;
        f(&mut doc)
    }

    /// Run `f` holding a momentary read lock. Since the backing document is
    /// a single mutex (no separate reader path), this still serializes with
    /// writers, but each call is held only for the duration of `f`.
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Document) -> R,
    {
        let doc = self.inner.lock().await;
        f(&doc)
    }

    /// Clone the whole document for a long-running computation (matching
    /// run) to read from without holding the writer lock. Matching-run
    /// outputs are then a pure function of this snapshot (§5).
    pub async fn snapshot(&self) -> Document {
        self.inner.lock().await.clone()
    }

    /// Canonical JSON of the whole document — the persisted-state snapshot
    /// export named in §6.
    pub async fn export_canonical(&self) -> Result<Vec<u8>, swapgraph_core::canonical::CanonicalError> {
        let doc = self.snapshot().await;
        swapgraph_core::canonical::canonical_bytes(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_observes_the_mutation() {
        let store = StateStore::new();
        store.write(|doc| doc.next_event_sequence = 42).await;
        let seq = store.read(|doc| doc.next_event_sequence).await;
        assert_eq!(seq, 42);
    }

    #[tokio::test]
    async fn snapshot_is_independent_of_later_writes() {
        let store = StateStore::new();
        store.write(|doc| doc.next_event_sequence = 1).await;
        let snap = store.snapshot().await;
        store.write(|doc| doc.next_event_sequence = 2).await;
        assert_eq!(snap.next_event_sequence, 1);
        let latest = store.read(|doc| doc.next_event_sequence).await;
        assert_eq!(latest, 2);
    }
}
