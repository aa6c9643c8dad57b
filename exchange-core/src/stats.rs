use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::Strategy;
use crate::market::{OrderBook, OrderKind};
use crate::types::{Cash, Price, Quantity, Symbol};

// ============================================================================
// Per-kind counters
// ============================================================================

/// Transactions counted by the order kind on one side of the trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct KindCounts {
    pub open_ended: u64,
    pub turn_based: u64,
    pub immediate: u64,
    pub execute_or_cancel: u64,
}

impl KindCounts {
    pub fn bump(&mut self, kind: OrderKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: OrderKind) -> u64 {
        match kind {
            OrderKind::OpenEnded => self.open_ended,
            OrderKind::TurnBased { .. } => self.turn_based,
            OrderKind::Immediate => self.immediate,
            OrderKind::ExecuteOrCancel => self.execute_or_cancel,
        }
    }

    pub fn total(&self) -> u64 {
        self.open_ended + self.turn_based + self.immediate + self.execute_or_cancel
    }

    pub fn merge(&mut self, other: &KindCounts) {
        self.open_ended += other.open_ended;
        self.turn_based += other.turn_based;
        self.immediate += other.immediate;
        self.execute_or_cancel += other.execute_or_cancel;
    }

    /// Report order: open-ended, turn-based, immediate, execute-or-cancel.
    pub fn rows(&self) -> [(&'static str, u64); 4] {
        [
            (OrderKind::OpenEnded.label(), self.open_ended),
            (OrderKind::TurnBased { last_turn: 0 }.label(), self.turn_based),
            (OrderKind::Immediate.label(), self.immediate),
            (OrderKind::ExecuteOrCancel.label(), self.execute_or_cancel),
        ]
    }

    fn slot(&mut self, kind: OrderKind) -> &mut u64 {
        match kind {
            OrderKind::OpenEnded => &mut self.open_ended,
            OrderKind::TurnBased { .. } => &mut self.turn_based,
            OrderKind::Immediate => &mut self.immediate,
            OrderKind::ExecuteOrCancel => &mut self.execute_or_cancel,
        }
    }
}

// ============================================================================
// Serializable results for JS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ShareStatistics {
    pub symbol: Symbol,
    pub last_price: Price,
    pub transactions: u64,
    pub expired: u64,
    pub cancelled: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketStatistics {
    pub transactions: u64,
    /// Listing order.
    pub shares: Vec<ShareStatistics>,
    pub purchases: KindCounts,
    pub sales: KindCounts,
}

impl MarketStatistics {
    /// Fold the counters of every book, in the order given.
    pub fn collect<'a>(books: impl IntoIterator<Item = &'a OrderBook>) -> Self {
        let mut stats = MarketStatistics::default();
        for book in books {
            let counters = book.counters();
            stats.transactions += counters.transactions;
            stats.purchases.merge(&counters.purchases);
            stats.sales.merge(&counters.sales);
            stats.shares.push(ShareStatistics {
                symbol: book.symbol().to_string(),
                last_price: book.last_price(),
                transactions: counters.transactions,
                expired: counters.expired,
                cancelled: counters.cancelled,
                rejected: counters.rejected,
            });
        }
        stats
    }

    pub fn share(&self, symbol: &str) -> Option<&ShareStatistics> {
        self.shares.iter().find(|s| s.symbol == symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct AgentSummary {
    pub id: u64,
    pub strategy: Strategy,
    pub cash: Cash,
    pub holdings: BTreeMap<Symbol, Quantity>,
}

// ============================================================================
// Console report
// ============================================================================

/// Final agent table followed by the transaction counters. Holdings and
/// per-share lines follow the order of `statistics.shares`.
pub struct Report<'a> {
    pub agents: &'a [AgentSummary],
    pub statistics: &'a MarketStatistics,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for agent in self.agents {
            write!(f, "{} {}:", agent.strategy.label(), agent.cash)?;
            for share in &self.statistics.shares {
                let quantity = agent.holdings.get(&share.symbol).copied().unwrap_or(0);
                write!(f, " {}: {quantity}", share.symbol)?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        writeln!(f, "Number of all transactions: {}", self.statistics.transactions)?;
        for share in &self.statistics.shares {
            writeln!(f, "Number of transactions {}: {}", share.symbol, share.transactions)?;
        }

        for (title, counts) in [
            ("Purchases", &self.statistics.purchases),
            ("Sales", &self.statistics.sales),
        ] {
            writeln!(f)?;
            writeln!(f, "{title}:")?;
            for (label, count) in counts.rows() {
                writeln!(f, "{label}: {count}")?;
            }
        }
        Ok(())
    }
}
