//! Global configuration constants for vecstore.
//!
//! Tuning parameters, storage limits, and cache defaults are defined here.
//! These are compile-time constants; runtime configuration is carried by
//! [`HnswConfig`](crate::hnsw::HnswConfig) and [`CacheConfig`](crate::cache::CacheConfig),
//! and by CLI flags in the `vecstore` binary.

/// Default maximum number of neighbors per node per layer (`M`).
///
/// Higher values improve connectivity but increase memory and link maintenance cost.
/// Must be at least 2 for the layer probability table to be non-empty.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default candidate-search width during construction.
///
/// Carried in the configuration and in snapshots. The greedy linking step
/// does not widen its search with it.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Layers whose assignment probability falls below this value are not added
/// to the probability table.
pub const LEVEL_PROBABILITY_FLOOR: f64 = 1e-9;

/// Highest node level accepted when loading a snapshot.
///
/// The probability table for the smallest legal `M` (2) stops below level 30.
pub const MAX_NODE_LEVEL: usize = 64;

/// Default number of results returned by a query.
pub const DEFAULT_K: usize = 3;

/// Default maximum number of cached query results.
pub const CACHE_DEFAULT_MAX_ENTRIES: usize = 100;

/// Default maximum age of a cached query result, in milliseconds.
pub const CACHE_DEFAULT_MAX_AGE_MS: u64 = 100;

/// Maximum length of a collection name or storage key in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Storage key holding the serialized HNSW snapshot.
pub const INDEX_KEY: &str = "hnsw";

/// Storage key holding the index metadata record.
pub const META_KEY: &str = "meta";

/// Default directory for collection files.
pub const DEFAULT_DATA_DIR: &str = "./data";
