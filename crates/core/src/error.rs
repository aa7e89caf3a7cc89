//! Error types for the HNSW engine and the vector store.

use crate::hnsw::NodeId;
use crate::storage::validate::ValidationError;

/// Errors produced by the HNSW engine.
#[derive(Debug, thiserror::Error)]
pub enum HnswError {
    /// The vector length differs from the dimension fixed by the first insertion.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector is empty or contains NaN / infinite components.
    #[error("embedding must be non-empty and contain only finite values")]
    InvalidEmbedding,

    /// A node with this id is already part of the graph.
    #[error("node {0} already exists")]
    DuplicateId(NodeId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The snapshot is structurally valid but describes an inconsistent graph.
    #[error("snapshot deserialization failed: {0}")]
    Deserialization(String),
}

/// Result type for HNSW engine operations.
pub type Result<T> = std::result::Result<T, HnswError>;

/// Errors surfaced by the persistence layer of [`VectorStore`](crate::storage::VectorStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector store is uninitialized")]
    Uninitialized,

    #[error("vector store index is missing")]
    IndexMissing,

    #[error("vector store index can't be deleted: {0}")]
    IndexPurgeFailed(String),

    #[error("snapshot validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Hnsw(#[from] HnswError),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encoding(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Encoding(e.to_string())
    }
}
