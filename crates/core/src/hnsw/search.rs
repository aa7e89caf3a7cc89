//! HNSW query: best-first expansion from the entry point.
//!
//! Results are returned in discovery order, not re-sorted by score. Nodes on
//! layer 0 are reported but never expanded, and the explored layer range only
//! narrows as the walk moves to lower-level nodes.

use crate::error::{HnswError, Result};
use crate::hnsw::frontier::RankedFrontier;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::node::NodeId;
use crate::hnsw::visited::ExpandedSlots;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

thread_local! {
    static EXPANDED: RefCell<ExpandedSlots> = RefCell::new(ExpandedSlots::new());
}

/// A node returned by a query with its similarity to the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub id: NodeId,
    pub content: Option<String>,
    pub embedding: Vec<f32>,
    /// Similarity to the query vector (higher = more similar).
    pub score: f32,
}

impl HnswIndex {
    /// Approximate k-nearest-neighbor query.
    ///
    /// Returns an empty result for an empty graph or `k == 0`. Only nodes with a
    /// strictly positive similarity are reported.
    pub fn query(&self, target: &[f32], k: usize) -> Result<Vec<ScoredNode>> {
        let Some(entry) = self.entry_point.and_then(|id| self.slot_of(id)) else {
            return Ok(Vec::new());
        };
        if let Some(expected) = self.dimension {
            if target.len() != expected {
                return Err(HnswError::DimensionMismatch {
                    expected,
                    actual: target.len(),
                });
            }
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        EXPANDED.with(|cell| {
            let mut expanded = cell.borrow_mut();
            expanded.begin(self.nodes.len());
            Ok(self.best_first(target, k, entry, &mut expanded))
        })
    }

    fn best_first(
        &self,
        target: &[f32],
        k: usize,
        entry: u32,
        expanded: &mut ExpandedSlots,
    ) -> Vec<ScoredNode> {
        let mut frontier = RankedFrontier::with_capacity(self.config.m * 2);
        frontier.push(entry, self.score(entry, target));

        let mut results: Vec<ScoredNode> = Vec::with_capacity(k);
        let mut layer_ptr = self.top_level;

        while results.len() < k {
            let Some((slot, score)) = frontier.pop() else {
                break;
            };
            if !expanded.mark(slot) {
                continue;
            }

            let node = &self.nodes[slot as usize];
            if score > 0.0 {
                results.push(ScoredNode {
                    id: node.id,
                    content: node.content.clone(),
                    embedding: node.embedding.clone(),
                    score,
                });
            }

            if node.level == 0 {
                continue;
            }

            layer_ptr = layer_ptr.min(node.level - 1);
            for layer in (0..=layer_ptr).rev() {
                for &neighbor in node.neighbors_at(layer) {
                    let Some(ns) = self.slot_of(neighbor) else {
                        continue;
                    };
                    if !expanded.is_marked(ns) {
                        frontier.push(ns, self.score(ns, target));
                    }
                }
            }
        }

        results.truncate(k);
        results
    }
}
