use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::Price;

// === PRICE HISTORY ===

/// Bounded record of the last traded price at each turn end, newest last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    prices: VecDeque<Price>,
    capacity: usize,
}

impl PriceHistory {
    /// Start a history holding only the opening price.
    pub fn new(opening: Price, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut prices = VecDeque::with_capacity(capacity);
        prices.push_back(opening);
        Self { prices, capacity }
    }

    pub fn record(&mut self, price: Price) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent first.
    pub fn recent(&self) -> impl Iterator<Item = Price> + '_ {
        self.prices.iter().rev().copied()
    }

    /// Mean of the `n` most recent prices.
    pub fn average_of_last(&self, n: usize) -> Option<f64> {
        self.average_of_last_from(n, 0)
    }

    /// Mean of `n` prices ending `k` entries back from the newest.
    ///
    /// Uses whatever is available when the history is shorter than `n + k`;
    /// `None` only when nothing lies `k` entries back.
    pub fn average_of_last_from(&self, n: usize, k: usize) -> Option<f64> {
        if n == 0 {
            return None;
        }
        let window: Vec<Price> = self.recent().skip(k).take(n).collect();
        if window.is_empty() {
            return None;
        }
        let sum: i64 = window.iter().sum();
        Some(sum as f64 / window.len() as f64)
    }

    /// True once `n + k` prices are on record.
    pub fn covers(&self, n: usize, k: usize) -> bool {
        self.prices.len() >= n + k
    }
}
