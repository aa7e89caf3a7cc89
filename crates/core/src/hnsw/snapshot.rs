//! Snapshot representation of an HNSW graph.
//!
//! A [`Snapshot`] is the document exchanged with the persistence layer:
//!
//! ```text
//! { "M": 16, "efConstruction": 200, "levelMax": 7, "entryPointId": 1,
//!   "metric": "cosine",
//!   "nodes": [[1, {"id": 1, "content": "foo", "level": 2,
//!                  "embedding": [0.5, 0.3], "neighbors": [[2], [2], []]}], ...] }
//! ```
//!
//! `entryPointId` is `-1` for an empty graph. Negative neighbor ids are
//! empty-slot sentinels and are dropped when loading.

use crate::config;
use crate::error::{HnswError, Result};
use crate::hnsw::graph::{HnswConfig, HnswIndex};
use crate::hnsw::level::LevelSampler;
use crate::hnsw::metric::SimilarityMetric;
use crate::hnsw::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Serialized form of a whole index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "M")]
    pub m: usize,
    pub ef_construction: usize,
    pub level_max: usize,
    pub entry_point_id: i64,
    /// Absent in older snapshots, which always used cosine.
    #[serde(default)]
    pub metric: Option<SimilarityMetric>,
    #[serde(alias = "node")]
    pub nodes: Vec<(NodeId, NodeRecord)>,
}

/// Serialized form of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub content: Option<String>,
    pub level: usize,
    pub embedding: Vec<f32>,
    pub neighbors: Vec<Vec<i64>>,
}

impl HnswIndex {
    /// Captures the full graph. Nodes appear in insertion order.
    pub fn to_snapshot(&self) -> Snapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let record = NodeRecord {
                    id: node.id,
                    content: node.content.clone(),
                    level: node.level,
                    embedding: node.embedding.clone(),
                    neighbors: node
                        .neighbors
                        .iter()
                        .map(|list| list.iter().map(|&id| i64::from(id)).collect())
                        .collect(),
                };
                (node.id, record)
            })
            .collect();

        Snapshot {
            m: self.config.m,
            ef_construction: self.config.ef_construction,
            level_max: self.level_max,
            entry_point_id: self.entry_point.map_or(-1, i64::from),
            metric: Some(self.config.metric),
            nodes,
        }
    }

    /// Rebuilds an index from a snapshot, checking that it describes a consistent graph.
    ///
    /// Levels for later insertions are drawn from OS entropy.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let config = HnswConfig {
            m: snapshot.m,
            ef_construction: snapshot.ef_construction,
            metric: snapshot.metric.unwrap_or_default(),
            dimension: None,
            seed: None,
        };
        config
            .validate()
            .map_err(|e| HnswError::Deserialization(e.to_string()))?;
        let sampler = LevelSampler::new(config.m, None);
        let mut index = HnswIndex::with_sampler(config, sampler);
        index.level_max = snapshot.level_max;

        let m = index.config.m;
        for (key, record) in snapshot.nodes {
            let node = node_from_record(key, record, m, index.dimension)?;
            if index.slots.contains_key(&node.id) {
                return Err(HnswError::Deserialization(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
            index.dimension.get_or_insert(node.embedding.len());
            index.top_level = index.top_level.max(node.level);
            index.slots.insert(node.id, index.nodes.len() as u32);
            index.nodes.push(node);
        }

        index.entry_point = match snapshot.entry_point_id {
            -1 if index.nodes.is_empty() => None,
            -1 => {
                return Err(HnswError::Deserialization(
                    "entry point unset in a non-empty graph".to_string(),
                ))
            }
            id => {
                let id = NodeId::try_from(id).ok().filter(|id| index.contains(*id));
                match id {
                    Some(id) => Some(id),
                    None => {
                        return Err(HnswError::Deserialization(format!(
                            "entry point {} does not resolve to a node",
                            snapshot.entry_point_id
                        )))
                    }
                }
            }
        };
        Ok(index)
    }
}

fn node_from_record(
    key: NodeId,
    record: NodeRecord,
    m: usize,
    dimension: Option<usize>,
) -> Result<Node> {
    let fail = |msg: String| Err(HnswError::Deserialization(format!("node {key}: {msg}")));

    if record.id != key {
        return fail(format!("record id {} differs from its key", record.id));
    }
    if let Some(expected) = dimension {
        if record.embedding.len() != expected {
            return fail(format!(
                "embedding length {} differs from graph dimension {}",
                record.embedding.len(),
                expected
            ));
        }
    }
    if record.embedding.is_empty() {
        return fail("empty embedding".to_string());
    }
    if record.level > config::MAX_NODE_LEVEL {
        return fail(format!(
            "level {} exceeds the maximum of {}",
            record.level,
            config::MAX_NODE_LEVEL
        ));
    }
    if record.neighbors.len().checked_sub(1) != Some(record.level) {
        return fail(format!(
            "{} neighbor lists for level {}",
            record.neighbors.len(),
            record.level
        ));
    }

    let mut neighbors = Vec::with_capacity(record.neighbors.len());
    for (layer, list) in record.neighbors.into_iter().enumerate() {
        let mut seen = HashSet::with_capacity(list.len());
        let mut ids = Vec::with_capacity(m);
        for raw in list.into_iter().filter(|&raw| raw >= 0) {
            let Ok(id) = NodeId::try_from(raw) else {
                return fail(format!("neighbor id {raw} out of range at layer {layer}"));
            };
            if id == key {
                return fail(format!("self reference at layer {layer}"));
            }
            if !seen.insert(id) {
                return fail(format!("duplicate neighbor {id} at layer {layer}"));
            }
            ids.push(id);
        }
        if ids.len() > m {
            return fail(format!("{} neighbors at layer {layer} exceed M={m}", ids.len()));
        }
        neighbors.push(ids);
    }

    Ok(Node {
        id: key,
        level: record.level,
        embedding: record.embedding,
        content: record.content,
        neighbors,
    })
}

/// Counts nodes per level, lowest level first.
pub fn level_histogram(snapshot: &Snapshot) -> Vec<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for (_, record) in &snapshot.nodes {
        *counts.entry(record.level).or_default() += 1;
    }
    let top = counts.keys().copied().max().map_or(0, |l| l + 1);
    (0..top).map(|l| counts.get(&l).copied().unwrap_or(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn sample_index(metric: SimilarityMetric) -> HnswIndex {
        let mut index = HnswIndex::new(HnswConfig {
            m: 4,
            metric,
            seed: Some(17),
            ..HnswConfig::default()
        })
        .unwrap();
        for i in 0..120u32 {
            let emb: Vec<f32> = (0..6)
                .map(|j| ((i * 7 + j * 13) % 29) as f32 / 29.0 - 0.3)
                .collect();
            index.add_vector(i, emb, Some(format!("doc-{i}"))).unwrap();
        }
        index
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let index = sample_index(SimilarityMetric::Euclidean);
        let restored = HnswIndex::from_snapshot(index.to_snapshot()).unwrap();

        assert_eq!(restored.entry_point(), index.entry_point());
        assert_eq!(restored.level_max(), index.level_max());
        assert_eq!(restored.top_level(), index.top_level());
        assert_eq!(restored.dimension(), index.dimension());
        assert_eq!(restored.metric(), SimilarityMetric::Euclidean);
        assert_eq!(restored.config.m, 4);
        let a: Vec<&Node> = index.nodes().collect();
        let b: Vec<&Node> = restored.nodes().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_through_json() {
        let index = sample_index(SimilarityMetric::Cosine);
        let snapshot = index.to_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let restored = HnswIndex::from_snapshot(parsed).unwrap();
        let q = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        assert_eq!(restored.query(&q, 5).unwrap(), index.query(&q, 5).unwrap());
    }

    #[test]
    fn test_json_field_names() {
        let mut index = HnswIndex::with_rng(HnswConfig::default(), StepRng::new(0, 0)).unwrap();
        index.add_vector(3, vec![0.5, 1.5], Some("c".into())).unwrap();
        let value = serde_json::to_value(index.to_snapshot()).unwrap();
        assert_eq!(value["M"], 16);
        assert_eq!(value["efConstruction"], 200);
        assert_eq!(value["levelMax"], 7);
        assert_eq!(value["entryPointId"], 3);
        assert_eq!(value["metric"], "cosine");
        assert_eq!(value["nodes"][0][0], 3);
        assert_eq!(value["nodes"][0][1]["content"], "c");
        assert_eq!(value["nodes"][0][1]["embedding"][1], 1.5);
        assert_eq!(value["nodes"][0][1]["neighbors"], serde_json::json!([[]]));
    }

    #[test]
    fn test_empty_index_round_trip() {
        let index = HnswIndex::with_default_config();
        let snapshot = index.to_snapshot();
        assert_eq!(snapshot.entry_point_id, -1);
        let restored = HnswIndex::from_snapshot(snapshot).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.entry_point(), None);
        assert_eq!(restored.dimension(), None);
    }

    #[test]
    fn test_legacy_snapshot_defaults_to_cosine_and_strips_sentinels() {
        let json = r#"{
            "M": 2, "efConstruction": 10, "levelMax": 0, "entryPointId": 1,
            "node": [
                [1, {"id": 1, "content": null, "level": 1, "embedding": [1.0, 0.0],
                     "neighbors": [[2], [-1, -1]]}],
                [2, {"id": 2, "content": "b", "level": 0, "embedding": [0.0, 1.0],
                     "neighbors": [[1, -1]]}]
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let index = HnswIndex::from_snapshot(snapshot).unwrap();
        assert_eq!(index.metric(), SimilarityMetric::Cosine);
        assert_eq!(index.level_max(), 0);
        assert_eq!(index.top_level(), 1);
        assert_eq!(index.get(1).unwrap().neighbors, vec![vec![2], vec![]]);
        assert_eq!(index.get(2).unwrap().neighbors, vec![vec![1]]);
    }

    fn two_node_snapshot() -> Snapshot {
        HnswIndex::from_snapshot(Snapshot {
            m: 4,
            ef_construction: 50,
            level_max: 3,
            entry_point_id: 1,
            metric: None,
            nodes: vec![
                (
                    1,
                    NodeRecord {
                        id: 1,
                        content: None,
                        level: 0,
                        embedding: vec![1.0, 2.0],
                        neighbors: vec![vec![2]],
                    },
                ),
                (
                    2,
                    NodeRecord {
                        id: 2,
                        content: None,
                        level: 0,
                        embedding: vec![2.0, 1.0],
                        neighbors: vec![vec![1]],
                    },
                ),
            ],
        })
        .unwrap()
        .to_snapshot()
    }

    fn assert_rejected(snapshot: Snapshot, fragment: &str) {
        match HnswIndex::from_snapshot(snapshot) {
            Err(HnswError::Deserialization(msg)) => {
                assert!(msg.contains(fragment), "unexpected message: {msg}")
            }
            other => panic!("expected deserialization error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_embedding_length_disagreement() {
        let mut s = two_node_snapshot();
        s.nodes[1].1.embedding = vec![1.0, 2.0, 3.0];
        assert_rejected(s, "graph dimension");
    }

    #[test]
    fn test_rejects_key_mismatch_and_duplicates() {
        let mut s = two_node_snapshot();
        s.nodes[1].0 = 7;
        assert_rejected(s, "differs from its key");

        let mut s = two_node_snapshot();
        s.nodes[1] = s.nodes[0].clone();
        assert_rejected(s, "duplicate node id");
    }

    #[test]
    fn test_rejects_bad_neighbor_lists() {
        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![2], vec![]];
        assert_rejected(s, "neighbor lists for level");

        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![1]];
        assert_rejected(s, "self reference");

        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![2, 2]];
        assert_rejected(s, "duplicate neighbor");

        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![2, 3, 4, 5, 6]];
        assert_rejected(s, "exceed M");
    }

    #[test]
    fn test_rejects_out_of_range_level() {
        let mut s = two_node_snapshot();
        s.nodes[0].1.level = usize::MAX;
        s.nodes[0].1.neighbors = vec![];
        assert_rejected(s, "exceeds the maximum");

        let mut s = two_node_snapshot();
        s.nodes[0].1.level = config::MAX_NODE_LEVEL + 1;
        s.nodes[0].1.neighbors = vec![vec![]; config::MAX_NODE_LEVEL + 2];
        assert_rejected(s, "exceeds the maximum");

        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![];
        assert_rejected(s, "0 neighbor lists for level 0");
    }

    #[test]
    fn test_rejects_out_of_range_neighbor_id() {
        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![2, i64::from(u32::MAX) + 1]];
        assert_rejected(s, "out of range");
    }

    #[test]
    fn test_huge_level_in_json_is_rejected() {
        let json = r#"{
            "M": 16, "efConstruction": 200, "levelMax": 7, "entryPointId": 1,
            "nodes": [[1, {"id": 1, "content": null, "level": 18446744073709551615,
                           "embedding": [1.0], "neighbors": []}]]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert!(matches!(
            HnswIndex::from_snapshot(snapshot),
            Err(HnswError::Deserialization(_))
        ));
    }

    #[test]
    fn test_rejects_bad_entry_point() {
        let mut s = two_node_snapshot();
        s.entry_point_id = 42;
        assert_rejected(s, "does not resolve");

        let mut s = two_node_snapshot();
        s.entry_point_id = -1;
        assert_rejected(s, "entry point unset");
    }

    #[test]
    fn test_rejects_invalid_m() {
        let mut s = two_node_snapshot();
        s.m = 1;
        assert_rejected(s, "M must be at least 2");
    }

    #[test]
    fn test_dangling_neighbor_ids_are_kept() {
        let mut s = two_node_snapshot();
        s.nodes[0].1.neighbors = vec![vec![2, 99]];
        let index = HnswIndex::from_snapshot(s).unwrap();
        assert_eq!(index.get(1).unwrap().neighbors_at(0), &[2, 99]);
        let results = index.query(&[1.0, 2.0], 3).unwrap();
        assert_eq!(results[0].id, 1);
        assert!(results.iter().all(|r| r.id != 99));
    }

    #[test]
    fn test_level_histogram() {
        let s = two_node_snapshot();
        assert_eq!(level_histogram(&s), vec![2]);
        let empty = HnswIndex::with_default_config().to_snapshot();
        assert!(level_histogram(&empty).is_empty());
    }
}
