//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! Nodes live in an arena and are addressed by caller-supplied ids. Each node
//! is assigned a level from a geometric-like distribution and keeps one
//! neighbor list per layer up to that level, bounded by `M`.
//!
//! Insertion descends greedily from the entry point and links the new node to
//! the single closest node it finds on every layer the two share. When a list
//! overflows, the least similar neighbor is dropped. Queries expand a
//! best-first frontier from the entry point and report nodes in the order
//! they are discovered.

/// Max-priority frontier with FIFO ordering among equal scores.
pub mod frontier;
/// HNSW graph structure and configuration.
pub mod graph;
/// Insertion and bulk build.
pub mod insert;
/// Level probability table and sampling.
pub mod level;
/// Similarity metrics: cosine and inverse euclidean.
pub mod metric;
/// Graph node type.
pub mod node;
/// Best-first query.
pub mod search;
/// Snapshot export and validated import.
pub mod snapshot;
/// Per-query bitset of expanded arena slots.
pub mod visited;

pub use frontier::RankedFrontier;
pub use graph::{HnswConfig, HnswIndex};
pub use insert::IndexItem;
pub use level::LevelSampler;
pub use metric::SimilarityMetric;
pub use node::{Node, NodeId};
pub use search::ScoredNode;
pub use snapshot::{level_histogram, NodeRecord, Snapshot};
