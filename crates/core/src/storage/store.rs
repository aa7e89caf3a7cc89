//! Vector store: an HNSW engine plus a durable collection and an optional cache.
//!
//! The engine sits behind a [`parking_lot::RwLock`]. Inserts and builds take
//! the write lock for the whole operation, queries share the read lock. Every
//! mutation clears the cache while the write lock is still held, and query
//! results are cached while the read lock is held, so a cached result never
//! outlives the graph it was computed from. Cache entries are scoped by the
//! collection name, so stores sharing one cache only clear their own entries.

use crate::cache::QueryCache;
use crate::config;
use crate::error::StoreError;
use crate::hnsw::{HnswConfig, HnswIndex, IndexItem, NodeId, ScoredNode, SimilarityMetric, Snapshot};
use crate::storage::collection::{CollectionHandle, StorageBackend};
use crate::storage::validate::validate_snapshot;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Index summary stored next to the snapshot under the `meta` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub dimension: Option<usize>,
    pub metric: SimilarityMetric,
    pub entry_point: Option<NodeId>,
    pub node_count: usize,
    pub m: usize,
    pub ef_construction: usize,
}

impl From<&HnswIndex> for IndexMeta {
    fn from(index: &HnswIndex) -> Self {
        Self {
            dimension: index.dimension(),
            metric: index.metric(),
            entry_point: index.entry_point(),
            node_count: index.len(),
            m: index.config.m,
            ef_construction: index.config.ef_construction,
        }
    }
}

/// A named, persistable HNSW index.
#[derive(Debug)]
pub struct VectorStore {
    name: String,
    index: RwLock<HnswIndex>,
    backend: Arc<dyn StorageBackend>,
    handle: RwLock<Option<Box<dyn CollectionHandle>>>,
    cache: Option<Arc<QueryCache>>,
}

impl VectorStore {
    /// Opens collection `name` on `backend` with an empty engine built from `config`.
    ///
    /// Nothing is loaded; call [`load_index`](Self::load_index) to restore a saved graph.
    pub fn open(
        name: &str,
        config: HnswConfig,
        backend: Arc<dyn StorageBackend>,
        cache: Option<Arc<QueryCache>>,
    ) -> Result<Self, StoreError> {
        let index = HnswIndex::new(config)?;
        Self::with_index(name, index, backend, cache)
    }

    /// Opens collection `name` around an existing engine.
    pub fn with_index(
        name: &str,
        index: HnswIndex,
        backend: Arc<dyn StorageBackend>,
        cache: Option<Arc<QueryCache>>,
    ) -> Result<Self, StoreError> {
        let handle = backend.open(name)?;
        tracing::info!("Opened vector store '{}'", name);
        Ok(Self {
            name: name.to_string(),
            index: RwLock::new(index),
            backend,
            handle: RwLock::new(Some(handle)),
            cache,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.read().dimension()
    }

    /// Summary of the in-memory graph.
    pub fn index_meta(&self) -> IndexMeta {
        IndexMeta::from(&*self.index.read())
    }

    /// Snapshot of the in-memory graph.
    pub fn snapshot(&self) -> Snapshot {
        self.index.read().to_snapshot()
    }

    /// Inserts one vector.
    pub fn add_vector(
        &self,
        id: NodeId,
        embedding: Vec<f32>,
        content: Option<String>,
    ) -> Result<(), StoreError> {
        let mut index = self.index.write();
        index.add_vector(id, embedding, content)?;
        self.clear_cache();
        Ok(())
    }

    /// Replaces the graph with one built from `items`, in order.
    ///
    /// On failure the previous graph is kept.
    pub fn build_index<I>(&self, items: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = IndexItem>,
    {
        let mut index = self.index.write();
        let count = index.build_index(items)?;
        self.clear_cache();
        tracing::info!("Built index for '{}' ({} vectors)", self.name, count);
        Ok(count)
    }

    /// Queries the graph, consulting the cache first when one is attached.
    pub fn query(&self, target: &[f32], k: usize) -> Result<Vec<ScoredNode>, StoreError> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&self.name, target, k)) {
            return Ok(hit);
        }
        let index = self.index.read();
        let results = index.query(target, k)?;
        if let Some(cache) = &self.cache {
            cache.set(&self.name, target, k, results.clone());
        }
        Ok(results)
    }

    /// Replaces the in-memory graph with the snapshot stored in the collection.
    pub fn load_index(&self) -> Result<(), StoreError> {
        let raw = {
            let handle = self.handle.read();
            let handle = handle.as_ref().ok_or(StoreError::Uninitialized)?;
            handle
                .get(config::INDEX_KEY)?
                .ok_or(StoreError::IndexMissing)?
        };

        let doc: serde_json::Value = serde_json::from_slice(&raw)?;
        validate_snapshot(&doc)?;
        let snapshot: Snapshot = serde_json::from_value(doc)?;
        let loaded = HnswIndex::from_snapshot(snapshot)?;

        if let Some(meta) = self.metadata()? {
            if meta.node_count != loaded.len() {
                tracing::warn!(
                    "Metadata for '{}' lists {} nodes, snapshot has {}",
                    self.name,
                    meta.node_count,
                    loaded.len()
                );
            }
        }

        let count = loaded.len();
        let mut index = self.index.write();
        *index = loaded;
        self.clear_cache();
        tracing::info!(
            "Loaded index for '{}' ({} vectors, {} bytes)",
            self.name,
            count,
            raw.len()
        );
        Ok(())
    }

    /// Writes the snapshot and its metadata record to the collection.
    pub fn save_index(&self) -> Result<(), StoreError> {
        let handle = self.handle.read();
        let handle = handle.as_ref().ok_or(StoreError::Uninitialized)?;

        let (snapshot, meta) = {
            let index = self.index.read();
            (index.to_snapshot(), IndexMeta::from(&*index))
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        handle.put(config::INDEX_KEY, &bytes)?;
        handle.put(config::META_KEY, &bincode::serialize(&meta)?)?;

        tracing::info!(
            "Saved index for '{}' ({} vectors, {} bytes)",
            self.name,
            meta.node_count,
            bytes.len()
        );
        Ok(())
    }

    /// Reads the stored metadata record, if any.
    pub fn metadata(&self) -> Result<Option<IndexMeta>, StoreError> {
        let handle = self.handle.read();
        let handle = handle.as_ref().ok_or(StoreError::Uninitialized)?;
        match handle.get(config::META_KEY)? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Purges the collection, reopens it empty and resets the in-memory graph.
    ///
    /// If reopening fails the store is left uninitialized.
    pub fn delete_index(&self) -> Result<(), StoreError> {
        let mut handle = self.handle.write();
        if handle.is_none() {
            return Err(StoreError::Uninitialized);
        }
        self.backend
            .delete(&self.name)
            .map_err(|e| StoreError::IndexPurgeFailed(e.to_string()))?;
        *handle = None;
        *handle = Some(self.backend.open(&self.name)?);

        let mut index = self.index.write();
        let fresh = HnswIndex::new(index.config.clone())?;
        *index = fresh;
        self.clear_cache();
        tracing::info!("Deleted index for '{}'", self.name);
        Ok(())
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear_scope(&self.name);
        }
    }
}
