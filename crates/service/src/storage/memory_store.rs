use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_revision, Document, DocumentStore, Revision, Versioned};
use crate::errors::ServiceError;

/// In-process single-slot store. Holds the serialized bytes so revisions
/// match what `JsonFileStore` would produce for the same compact document.
#[derive(Default)]
pub struct MemoryDocumentStore {
    slot: RwLock<Option<Vec<u8>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_document(doc: &Document) -> Result<Arc<Self>, ServiceError> {
        let bytes = encode(doc)?;
        Ok(Arc::new(Self { slot: RwLock::new(Some(bytes)) }))
    }

    /// Empty the slot, as if the backing medium had gone away.
    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

fn encode(doc: &Document) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec(doc).map_err(|e| ServiceError::storage("serialize document", e))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load_versioned(&self) -> Result<Versioned, ServiceError> {
        let slot = self.slot.read().await;
        let bytes = slot
            .as_ref()
            .ok_or_else(|| ServiceError::StorageUnavailable("memory slot is empty".into()))?;
        Versioned::from_bytes(bytes.clone(), "parse memory slot")
    }

    async fn replace_matching(
        &self,
        expected: Option<&[Revision]>,
        doc: &Document,
    ) -> Result<Revision, ServiceError> {
        let bytes = encode(doc)?;
        let mut slot = self.slot.write().await;
        let current = slot.as_deref().map(Revision::of_bytes);
        check_revision(expected, current.as_ref())?;
        let revision = Revision::of_bytes(&bytes);
        *slot = Some(bytes);
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn empty_slot_is_unavailable() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(store.load().await, Err(ServiceError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn replace_is_wholesale() -> Result<(), anyhow::Error> {
        let store = MemoryDocumentStore::with_document(&json!({"students": ["Alice"], "term": "fall"}))?;
        store.replace(&json!({"students": ["Bob"]})).await?;
        // no merge with the previous document
        assert_eq!(store.load().await?, json!({"students": ["Bob"]}));

        store.clear().await;
        assert!(store.load().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn conditional_replace_uses_byte_revision() -> Result<(), anyhow::Error> {
        let store = MemoryDocumentStore::with_document(&json!({"students": []}))?;
        let rev = store.load_versioned().await?.revision;
        assert_eq!(rev, Revision::of_bytes(br#"{"students":[]}"#));

        store.replace_if(Some(&rev), &json!({"students": ["Zoe"]})).await?;
        let stale = store.replace_if(Some(&rev), &json!({"students": []})).await;
        assert!(matches!(stale, Err(ServiceError::RevisionMismatch { .. })));
        Ok(())
    }
}
