//! HNSW insertion: greedy descent from the entry point and symmetric linking.
//!
//! A new node is linked to the single closest node found by a greedy walk, on
//! every layer both nodes share. Lists that grow past `M` drop their least
//! similar neighbor.

use crate::error::Result;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::level::LevelSampler;
use crate::hnsw::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `(id, embedding, content)` triple for batch construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: NodeId,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub content: Option<String>,
}

impl IndexItem {
    pub fn new(id: NodeId, embedding: Vec<f32>, content: Option<String>) -> Self {
        Self {
            id,
            embedding,
            content,
        }
    }
}

impl HnswIndex {
    /// Inserts a vector and links it into the graph.
    ///
    /// The first insertion fixes the index dimension. On error the graph is unchanged.
    pub fn add_vector(
        &mut self,
        id: NodeId,
        embedding: Vec<f32>,
        content: Option<String>,
    ) -> Result<()> {
        self.check_embedding(&embedding)?;
        if self.contains(id) {
            return Err(crate::error::HnswError::DuplicateId(id));
        }

        let level = self.sampler.sample();
        // The descent runs before the node is registered, so it never meets itself.
        let closest = self.greedy_closest(&embedding);

        let slot = self.nodes.len() as u32;
        self.dimension.get_or_insert(embedding.len());
        self.nodes
            .push(Node::new(id, level, embedding, content, self.config.m));
        self.slots.insert(id, slot);

        let Some(closest) = closest else {
            self.entry_point = Some(id);
            self.top_level = level;
            return Ok(());
        };

        let (closest_id, closest_level) = {
            let node = &self.nodes[closest as usize];
            (node.id, node.level)
        };
        for layer in 0..=level.min(closest_level) {
            self.connect(closest, id, layer);
            self.connect(slot, closest_id, layer);
        }

        if level > self.top_level {
            tracing::trace!(id, level, "promoting entry point");
            self.entry_point = Some(id);
            self.top_level = level;
        }
        Ok(())
    }

    /// Replaces the graph with one built from `items`, inserted strictly in order.
    ///
    /// The new graph is staged and swapped in only if every insertion succeeds;
    /// otherwise the previous graph is kept and the first error is returned.
    /// Returns the number of nodes inserted.
    pub fn build_index<I>(&mut self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = IndexItem>,
    {
        let mut staged = self.staged();
        let mut count = 0usize;
        for item in items {
            if let Err(e) = staged.add_vector(item.id, item.embedding, item.content) {
                self.sampler = staged.sampler;
                return Err(e);
            }
            count += 1;
        }
        *self = staged;
        Ok(count)
    }

    /// Empty graph with this index's configuration, taking over its level sampler.
    fn staged(&mut self) -> HnswIndex {
        let placeholder = LevelSampler::new(self.config.m, None);
        let sampler = std::mem::replace(&mut self.sampler, placeholder);
        HnswIndex {
            config: self.config.clone(),
            nodes: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            level_max: self.level_max,
            top_level: 0,
            dimension: self.dimension,
            sampler,
        }
    }

    /// Greedy walk from the entry point, layer `top_level` down to 0.
    ///
    /// On each layer only the current node's neighbors are examined. The walk moves
    /// to the best one if it beats the current node and stops entirely when it does
    /// not. Layers without resolvable neighbors are skipped.
    fn greedy_closest(&self, target: &[f32]) -> Option<u32> {
        let mut closest = self.slot_of(self.entry_point?)?;
        let mut closest_sim = self.score(closest, target);

        for layer in (0..=self.top_level).rev() {
            match self.best_neighbor(closest, target, layer) {
                Some((slot, sim)) if sim > closest_sim => {
                    closest = slot;
                    closest_sim = sim;
                }
                Some(_) => break,
                None => {}
            }
        }
        Some(closest)
    }

    /// Most similar resolvable neighbor of `slot` at `layer`. Earlier entries win ties.
    fn best_neighbor(&self, slot: u32, target: &[f32], layer: usize) -> Option<(u32, f32)> {
        let mut best: Option<(u32, f32)> = None;
        for &neighbor in self.nodes[slot as usize].neighbors_at(layer) {
            let Some(ns) = self.slot_of(neighbor) else {
                continue;
            };
            let sim = self.score(ns, target);
            if best.map_or(true, |(_, b)| sim > b) {
                best = Some((ns, sim));
            }
        }
        best
    }

    /// Appends `neighbor` to the layer list of the node at `owner`, keeping the list
    /// free of duplicates and self-links and bounded by `M`.
    fn connect(&mut self, owner: u32, neighbor: NodeId, layer: usize) {
        let m = self.config.m;
        let node = &mut self.nodes[owner as usize];
        if node.id == neighbor {
            return;
        }
        let Some(list) = node.neighbors.get_mut(layer) else {
            return;
        };
        if list.contains(&neighbor) {
            return;
        }
        list.push(neighbor);
        if list.len() > m {
            self.evict_least_similar(owner, layer);
        }
    }

    /// Removes the neighbor least similar to the list owner. Dangling ids go first.
    fn evict_least_similar(&mut self, owner: u32, layer: usize) {
        let metric = self.config.metric;
        let node = &self.nodes[owner as usize];
        let worst = node.neighbors[layer]
            .iter()
            .enumerate()
            .map(|(pos, &id)| {
                let sim = self.slot_of(id).map_or(f32::NEG_INFINITY, |s| {
                    metric.similarity(&node.embedding, &self.nodes[s as usize].embedding)
                });
                (pos, sim)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(pos, _)| pos);

        if let Some(pos) = worst {
            let evicted = self.nodes[owner as usize].neighbors[layer].remove(pos);
            tracing::trace!(owner = self.nodes[owner as usize].id, evicted, layer, "evicted neighbor");
        }
    }
}
