//! Build/query benchmark on uniformly random vectors.
//! Reports insert throughput, query QPS, and recall@k against brute force.
//!
//! Usage: cargo bench --bench build_query

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Instant;
use vecstore_core::hnsw::{level_histogram, HnswConfig, HnswIndex, IndexItem, SimilarityMetric};

const SIZE: u32 = 20_000;
const DIM: usize = 64;
const QUERIES: usize = 1_000;
const K: usize = 10;

fn random_vectors(n: usize, dim: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

/// Exact top-k ids by similarity.
fn brute_force(metric: SimilarityMetric, data: &[Vec<f32>], q: &[f32], k: usize) -> Vec<u32> {
    let mut scored: Vec<(f32, u32)> = data
        .iter()
        .enumerate()
        .map(|(i, v)| (metric.similarity(v, q), i as u32))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(k).map(|(_, id)| id).collect()
}

fn recall_at_k(predicted: &[u32], truth: &[u32]) -> f64 {
    let truth: HashSet<u32> = truth.iter().copied().collect();
    let found = predicted.iter().filter(|id| truth.contains(id)).count();
    found as f64 / truth.len().max(1) as f64
}

fn main() {
    println!("=== Build/Query Benchmark: {SIZE} x {DIM}d random vectors ===");

    let mut rng = StdRng::seed_from_u64(7);
    let data = random_vectors(SIZE as usize, DIM, &mut rng);
    let queries = random_vectors(QUERIES, DIM, &mut rng);

    for metric in [SimilarityMetric::Cosine, SimilarityMetric::Euclidean] {
        println!();
        println!("--- metric={metric} M=16 ---");

        let config = HnswConfig {
            metric,
            seed: Some(42),
            ..HnswConfig::default()
        };
        let mut index = match HnswIndex::new(config) {
            Ok(index) => index,
            Err(e) => panic!("invalid config: {e}"),
        };

        let items = data
            .iter()
            .enumerate()
            .map(|(i, v)| IndexItem::new(i as u32, v.clone(), None));
        let t0 = Instant::now();
        let built = index.build_index(items).unwrap();
        let build_time = t0.elapsed();
        println!(
            "  Build time: {:.2}s ({:.0} inserts/s)",
            build_time.as_secs_f64(),
            built as f64 / build_time.as_secs_f64()
        );
        println!("  Levels: {:?}", level_histogram(&index.to_snapshot()));

        let t0 = Instant::now();
        let predicted: Vec<Vec<u32>> = queries
            .iter()
            .map(|q| index.query(q, K).unwrap().iter().map(|r| r.id).collect())
            .collect();
        let elapsed = t0.elapsed();
        println!(
            "  QPS: {:.1} ({:.0} us avg)",
            QUERIES as f64 / elapsed.as_secs_f64(),
            elapsed.as_micros() as f64 / QUERIES as f64
        );

        let mut total_recall = 0.0f64;
        let mut total_returned = 0usize;
        for (q, ids) in queries.iter().zip(&predicted) {
            total_returned += ids.len();
            total_recall += recall_at_k(ids, &brute_force(metric, &data, q, K));
        }
        println!(
            "  Recall@{K}: {:.4}  avg results: {:.1}",
            total_recall / QUERIES as f64,
            total_returned as f64 / QUERIES as f64
        );
    }

    println!();
    println!("=== Benchmark complete ===");
}
