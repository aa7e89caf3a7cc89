//! Ranked frontier: the work-list of candidates used during query expansion.
//!
//! Items pop in descending score order. Equal scores pop in the order they were
//! pushed. Duplicates are allowed; callers deduplicate with a visited set.

use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Ranked<T> {
    score: OrderedFloat<f32>,
    seq: Reverse<u64>,
    item: T,
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-priority work-list keyed by score, stable on ties.
#[derive(Debug)]
pub struct RankedFrontier<T> {
    heap: BinaryHeap<Ranked<T>>,
    next_seq: u64,
}

impl<T> RankedFrontier<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Adds `item` ranked by `score`.
    pub fn push(&mut self, item: T, score: f32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Ranked {
            score: OrderedFloat(score),
            seq: Reverse(seq),
            item,
        });
    }

    /// Removes and returns the best-ranked item with its score.
    pub fn pop(&mut self) -> Option<(T, f32)> {
        self.heap.pop().map(|r| (r.item, r.score.0))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<T> Default for RankedFrontier<T> {
    fn default() -> Self {
        Self::new()
    }
}
