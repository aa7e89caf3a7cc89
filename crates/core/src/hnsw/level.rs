//! Layer assignment for new nodes.
//!
//! The probability of landing on layer `l` decays geometrically:
//! `p(l) = exp(-l / mL) * (1 - exp(-1 / mL))` with `mL = 1 / ln(M)`.
//! Layers are added to the table until `p(l)` drops below
//! [`LEVEL_PROBABILITY_FLOOR`](crate::config::LEVEL_PROBABILITY_FLOOR).

use crate::config;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Probability table plus the random source used to draw levels.
pub struct LevelSampler {
    probs: Vec<f64>,
    rng: Box<dyn RngCore + Send + Sync>,
}

impl LevelSampler {
    /// Sampler seeded from OS entropy, or from `seed` when given.
    pub fn new(m: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(m, rng)
    }

    /// Sampler drawing from a caller-supplied random source.
    pub fn with_rng(m: usize, rng: impl RngCore + Send + Sync + 'static) -> Self {
        Self {
            probs: probabilities(m),
            rng: Box::new(rng),
        }
    }

    /// Highest layer present in the probability table.
    pub fn level_max(&self) -> usize {
        self.probs.len().saturating_sub(1)
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    /// Draws a level for a new node.
    pub fn sample(&mut self) -> usize {
        let r: f64 = self.rng.gen();
        self.level_for(r)
    }

    /// Maps a uniform draw `r` in `[0, 1)` onto the table, consuming probability
    /// mass layer by layer. Falls back to the top layer when the table is exhausted.
    pub fn level_for(&self, mut r: f64) -> usize {
        for (level, &p) in self.probs.iter().enumerate() {
            if r < p {
                return level;
            }
            r -= p;
        }
        self.level_max()
    }
}

impl std::fmt::Debug for LevelSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelSampler")
            .field("levels", &self.probs.len())
            .finish_non_exhaustive()
    }
}

/// Per-layer assignment probabilities for a graph with `m` neighbors per layer.
///
/// Empty for `m < 2`, where `ln(m)` gives no decay.
pub fn probabilities(m: usize) -> Vec<f64> {
    let mut probs = Vec::new();
    if m < 2 {
        return probs;
    }
    let level_mult = 1.0 / (m as f64).ln();
    let mut level = 0usize;
    loop {
        let p = (-(level as f64) / level_mult).exp() * (1.0 - (-1.0 / level_mult).exp());
        if p < config::LEVEL_PROBABILITY_FLOOR {
            break;
        }
        probs.push(p);
        level += 1;
    }
    probs
}
