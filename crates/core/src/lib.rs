//! # vecstore-core
//!
//! Embeddable in-memory approximate nearest neighbor index built on HNSW,
//! with a small persistence layer and a TTL-bounded query cache.
//!
//! The engine ([`hnsw::HnswIndex`]) is synchronous and single-writer. The
//! store ([`storage::VectorStore`]) wraps it behind a reader-writer lock and
//! saves snapshots through a pluggable key/value backend.

/// Bounded query result cache with per-entry expiry.
pub mod cache;
/// Global configuration constants: limits, defaults, and storage keys.
pub mod config;
/// Error types for the engine and the store.
pub mod error;
/// HNSW approximate nearest neighbor index: graph, insertion, query, and snapshots.
pub mod hnsw;
/// Storage layer: backends, CRC-checked files, snapshot validation, and the vector store.
pub mod storage;

pub use error::{HnswError, Result, StoreError};
pub use hnsw::{HnswConfig, HnswIndex, IndexItem, ScoredNode, SimilarityMetric};
pub use storage::VectorStore;
