// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Streaming Top-K
//!
//! Keeps the K best `(score, key)` entries seen so far. Higher scores win;
//! equal scores are ordered by key ascending, so results are deterministic.
//!
//! # Algorithm
//!
//! A bounded binary heap whose root is the *worst* retained entry:
//! - While fewer than K entries are held, every entry is kept
//! - Afterwards an entry replaces the root only if it ranks better
//!
//! Time O(N log K), space O(K).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct Scored<T> {
    score: f64,
    key: T,
}

impl<T: Ord> Ord for Scored<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // "Greater" means ranks worse, so the heap root is the entry to evict
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl<T: Ord> PartialOrd for Scored<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> PartialEq for Scored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Scored<T> {}

/// Bounded collection of the K highest-scoring keys
#[derive(Debug, Clone)]
pub struct TopK<T: Ord> {
    heap: BinaryHeap<Scored<T>>,
    k: usize,
    processed_count: usize,
}

impl<T: Ord> TopK<T> {
    /// Create a TopK keeping at most `k` entries
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            processed_count: 0,
        }
    }

    /// Offer an entry; NaN scores are ignored
    pub fn add(&mut self, key: T, score: f64) {
        self.processed_count += 1;
        if self.k == 0 || score.is_nan() {
            return;
        }

        let candidate = Scored { score, key };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return;
        }

        // Heap is full - replace the worst entry if the candidate ranks better
        if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    /// Score of the worst retained entry
    pub fn min_score(&self) -> Option<f64> {
        self.heap.peek().map(|item| item.score)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of entries offered so far
    pub fn processed(&self) -> usize {
        self.processed_count
    }

    /// Retained entries, best first
    pub fn into_sorted_vec(self) -> Vec<(T, f64)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|s| (s.key, s.score))
            .collect()
    }
}
