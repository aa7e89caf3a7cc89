//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] defines tuning parameters (M, ef_construction, metric).
//! [`HnswIndex`] owns the node arena, the id → slot map, the entry point and
//! the level sampler.

use crate::config;
use crate::error::{HnswError, Result};
use crate::hnsw::level::LevelSampler;
use crate::hnsw::metric::SimilarityMetric;
use crate::hnsw::node::{Node, NodeId};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration parameters for an HNSW index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum neighbors kept per node per layer.
    pub m: usize,
    /// Candidate list size reserved for construction. Persisted, not used by greedy linking.
    pub ef_construction: usize,
    /// Similarity function for every comparison in the index.
    pub metric: SimilarityMetric,
    /// Embedding dimension fixed up front. When `None`, the first insertion fixes it.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Seed for level sampling. When `None`, levels are drawn from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            metric: SimilarityMetric::Cosine,
            dimension: None,
            seed: None,
        }
    }
}

impl HnswConfig {
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(HnswError::InvalidConfig(format!(
                "M must be at least 2, got {}",
                self.m
            )));
        }
        if self.dimension == Some(0) {
            return Err(HnswError::InvalidConfig(
                "dimension must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// HNSW index: an arena of [`Node`]s addressed through a caller id → slot map.
///
/// Neighbor lists store caller ids, never slots, so the arena layout is not
/// part of the graph's identity.
#[derive(Debug)]
pub struct HnswIndex {
    pub config: HnswConfig,
    pub(crate) nodes: Vec<Node>,
    pub(crate) slots: HashMap<NodeId, u32>,
    pub(crate) entry_point: Option<NodeId>,
    /// Top layer of the probability table.
    pub(crate) level_max: usize,
    /// Highest level of any node in the graph.
    pub(crate) top_level: usize,
    pub(crate) dimension: Option<usize>,
    pub(crate) sampler: LevelSampler,
}

impl HnswIndex {
    /// Creates an empty index. Levels are drawn from `config.seed` when set.
    pub fn new(config: HnswConfig) -> Result<Self> {
        config.validate()?;
        let sampler = LevelSampler::new(config.m, config.seed);
        Ok(Self::with_sampler(config, sampler))
    }

    /// Creates an empty index drawing levels from a caller-supplied random source.
    pub fn with_rng(config: HnswConfig, rng: impl RngCore + Send + Sync + 'static) -> Result<Self> {
        config.validate()?;
        let sampler = LevelSampler::with_rng(config.m, rng);
        Ok(Self::with_sampler(config, sampler))
    }

    /// Creates an empty index with default configuration (cosine, M=16, ef_c=200).
    pub fn with_default_config() -> Self {
        let config = HnswConfig::default();
        let sampler = LevelSampler::new(config.m, None);
        Self::with_sampler(config, sampler)
    }

    pub(crate) fn with_sampler(config: HnswConfig, sampler: LevelSampler) -> Self {
        Self {
            level_max: sampler.level_max(),
            dimension: config.dimension,
            config,
            nodes: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            top_level: 0,
            sampler,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Embedding dimension, or `None` before the first insertion.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn entry_point(&self) -> Option<NodeId> {
        self.entry_point
    }

    /// Top layer of the level probability table.
    pub fn level_max(&self) -> usize {
        self.level_max
    }

    /// Highest level of any node inserted so far.
    pub fn top_level(&self) -> usize {
        self.top_level
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.config.metric
    }

    /// Looks up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slot_of(id).map(|slot| &self.nodes[slot as usize])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Iterates over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Drops every node. The configuration, level sampler and fixed dimension are kept.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.slots.clear();
        self.entry_point = None;
        self.top_level = 0;
    }

    #[inline]
    pub(crate) fn slot_of(&self, id: NodeId) -> Option<u32> {
        self.slots.get(&id).copied()
    }

    /// Similarity between the node at `slot` and `target`.
    #[inline]
    pub(crate) fn score(&self, slot: u32, target: &[f32]) -> f32 {
        self.config
            .metric
            .similarity(&self.nodes[slot as usize].embedding, target)
    }

    /// Checks an embedding against the fixed dimension and value constraints.
    pub(crate) fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        if let Some(expected) = self.dimension {
            if embedding.len() != expected {
                return Err(HnswError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }
        if embedding.is_empty() || embedding.iter().any(|v| !v.is_finite()) {
            return Err(HnswError::InvalidEmbedding);
        }
        Ok(())
    }
}
