pub mod book;
pub mod feasibility;
pub mod history;
pub mod orders;

use std::collections::BTreeMap;

pub use book::*;
pub use history::PriceHistory;
pub use orders::*;

use crate::types::{Price, Symbol};

/// Read-only view of every listed share, handed to strategies when they
/// decide. Strategies never see the queues mutably.
#[derive(Debug, Clone, Copy)]
pub struct Market<'a> {
    shares: &'a [Symbol],
    books: &'a BTreeMap<Symbol, OrderBook>,
}

impl<'a> Market<'a> {
    pub fn new(shares: &'a [Symbol], books: &'a BTreeMap<Symbol, OrderBook>) -> Self {
        Self { shares, books }
    }

    /// Listed symbols in listing order.
    pub fn shares(&self) -> &'a [Symbol] {
        self.shares
    }

    pub fn book(&self, symbol: &str) -> Option<&'a OrderBook> {
        self.books.get(symbol)
    }

    pub fn last_price(&self, symbol: &str) -> Option<Price> {
        self.book(symbol).map(OrderBook::last_price)
    }

    pub fn history(&self, symbol: &str) -> Option<&'a PriceHistory> {
        self.book(symbol).map(OrderBook::history)
    }
}
