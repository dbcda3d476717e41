//! Service layer for the student roster.
//! - `storage` holds the single-slot record store and its implementations.
//! - `runtime` prepares the filesystem layout the server expects.

pub mod errors;
pub mod runtime;
pub mod storage;

pub use errors::ServiceError;
pub use storage::{DocumentStore, JsonFileStore, MemoryDocumentStore, Revision, Versioned, WriteMode};
