//! Storage layer: key/value backends, checksummed files, snapshot validation,
//! and the vector store.
//!
//! The [`VectorStore`] saves its graph as a JSON snapshot under the `hnsw` key
//! and a bincode [`IndexMeta`] record under `meta`. The file backend writes
//! each value atomically (temp file + rename) with a CRC32 footer.

/// Storage backends and collection handles.
pub mod collection;
/// Atomic, CRC32-checked value files.
pub mod persistence;
/// Vector store: engine + collection + cache.
pub mod store;
/// Snapshot document shape validation.
pub mod validate;

pub use collection::{validate_name, CollectionHandle, FileBackend, MemoryBackend, StorageBackend};
pub use store::{IndexMeta, VectorStore};
pub use validate::{validate_snapshot, ValidationError};
