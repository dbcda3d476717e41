//! Storage abstractions for the service layer
//!
//! The roster is persisted as one opaque JSON document in a single slot.
//! `DocumentStore` is the contract; `JsonFileStore` backs it with a file on
//! disk and `MemoryDocumentStore` keeps it in process memory.

pub mod json_file_store;
pub mod memory_store;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ServiceError;

pub use json_file_store::{JsonFileStore, WriteMode};
pub use memory_store::MemoryDocumentStore;

/// The whole collection. Never interpreted by the store.
pub type Document = Value;

/// Opaque token identifying a particular stored byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Derive the revision of serialized document bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self(format!("{:016x}", hasher.finish()))
    }

    /// Wrap a token received from a caller (e.g. an `If-Match` header).
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded document together with the bytes it was parsed from and their
/// revision. `raw` is exactly what the backing medium holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub document: Document,
    pub raw: Vec<u8>,
    pub revision: Revision,
}

impl Versioned {
    /// Parse stored bytes; anything that is not JSON is unavailable storage.
    pub fn from_bytes(raw: Vec<u8>, context: &str) -> Result<Self, ServiceError> {
        let document = serde_json::from_slice(&raw).map_err(|e| ServiceError::storage(context, e))?;
        let revision = Revision::of_bytes(&raw);
        Ok(Self { document, raw, revision })
    }
}

/// Single-slot durable storage for one JSON document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read and parse the stored document with its revision.
    async fn load_versioned(&self) -> Result<Versioned, ServiceError>;

    /// Overwrite the stored document. With `expected` set, only write when
    /// the current revision is one of the listed revisions (an empty list
    /// never matches); with `None`, last write wins.
    async fn replace_matching(
        &self,
        expected: Option<&[Revision]>,
        doc: &Document,
    ) -> Result<Revision, ServiceError>;

    /// Single-revision form of [`DocumentStore::replace_matching`].
    async fn replace_if(
        &self,
        expected: Option<&Revision>,
        doc: &Document,
    ) -> Result<Revision, ServiceError> {
        self.replace_matching(expected.map(std::slice::from_ref), doc).await
    }

    async fn load(&self) -> Result<Document, ServiceError> {
        Ok(self.load_versioned().await?.document)
    }

    async fn replace(&self, doc: &Document) -> Result<(), ServiceError> {
        self.replace_if(None, doc).await.map(|_| ())
    }
}

/// Check the current revision against the accepted ones.
pub(crate) fn check_revision(
    expected: Option<&[Revision]>,
    current: Option<&Revision>,
) -> Result<(), ServiceError> {
    let Some(accepted) = expected else {
        return Ok(());
    };
    if current.is_some_and(|cur| accepted.contains(cur)) {
        return Ok(());
    }
    let expected = if accepted.is_empty() {
        "<none>".to_string()
    } else {
        accepted.iter().map(Revision::as_str).collect::<Vec<_>>().join(", ")
    };
    Err(ServiceError::RevisionMismatch {
        expected,
        current: current.map(|c| c.to_string()).unwrap_or_else(|| "<none>".to_string()),
    })
}
