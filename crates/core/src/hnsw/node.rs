//! Graph node: an embedding, its content payload, and per-layer adjacency lists.

/// Caller-supplied node identity.
pub type NodeId = u32;

/// A single vector in the HNSW graph.
///
/// `neighbors` has exactly `level + 1` lists, one per layer from 0 to `level`.
/// Lists hold neighbor ids only; an id that no longer resolves is treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub level: usize,
    pub embedding: Vec<f32>,
    pub content: Option<String>,
    pub neighbors: Vec<Vec<NodeId>>,
}

impl Node {
    /// Creates a node with `level + 1` empty neighbor lists, each sized for `m` entries.
    pub fn new(
        id: NodeId,
        level: usize,
        embedding: Vec<f32>,
        content: Option<String>,
        m: usize,
    ) -> Self {
        Self {
            id,
            level,
            embedding,
            content,
            neighbors: (0..=level).map(|_| Vec::with_capacity(m)).collect(),
        }
    }

    /// Neighbor ids at `layer`, or an empty slice above this node's level.
    #[inline]
    pub fn neighbors_at(&self, layer: usize) -> &[NodeId] {
        self.neighbors.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }
}
