//! Look-ahead for execute-or-cancel orders.
//!
//! Before an all-or-nothing order trades, we replay matching against the
//! resting opposite queue without touching the live book. Consumed
//! quantities and cash movements go into a small overlay keyed by queue slot
//! and by agent. All orders of one agent share a single cash entry, so an
//! agent's resting orders are treated as one identity while probing.

use std::collections::HashMap;

use crate::agents::Agents;
use crate::types::{AgentId, Cash, Quantity, Side};

use super::orders::{Order, execution_price};

/// Whether the order at `index` on `side` can be filled completely right now.
///
/// `cursors` are the live matching positions `(bid, ask)`: orders in front of
/// them are already consumed or skipped for this pass.
pub fn is_feasible(
    bids: &[Order],
    asks: &[Order],
    agents: &Agents,
    cursors: (usize, usize),
    side: Side,
    index: usize,
) -> bool {
    let mut probe = Probe {
        bids,
        asks,
        agents,
        starts: cursors,
        taken: HashMap::new(),
        cash: HashMap::new(),
    };
    probe.can_fill(side, index)
}

struct Probe<'a> {
    bids: &'a [Order],
    asks: &'a [Order],
    agents: &'a Agents,
    starts: (usize, usize),
    taken: HashMap<(Side, usize), Quantity>,
    cash: HashMap<AgentId, Cash>,
}

type Overlay = (HashMap<(Side, usize), Quantity>, HashMap<AgentId, Cash>);

impl<'a> Probe<'a> {
    fn queue(&self, side: Side) -> &'a [Order] {
        match side {
            Side::Buy => self.bids,
            Side::Sell => self.asks,
        }
    }

    fn start(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.starts.0,
            Side::Sell => self.starts.1,
        }
    }

    fn remaining(&self, side: Side, index: usize) -> Quantity {
        let taken = self.taken.get(&(side, index)).copied().unwrap_or(0);
        self.queue(side)[index].quantity - taken
    }

    fn cash_of(&self, agent: AgentId) -> Cash {
        self.cash
            .get(&agent)
            .copied()
            .or_else(|| self.agents.get(agent).map(|a| a.cash))
            .unwrap_or(0)
    }

    fn snapshot(&self) -> Overlay {
        (self.taken.clone(), self.cash.clone())
    }

    fn restore(&mut self, overlay: Overlay) {
        (self.taken, self.cash) = overlay;
    }

    /// Simulated settlement; refuses when the buyer's overlay cash is short.
    fn trade(&mut self, side: Side, index: usize, other: usize, quantity: Quantity) -> bool {
        let (bid_index, ask_index) = match side {
            Side::Buy => (index, other),
            Side::Sell => (other, index),
        };
        let bid = &self.bids[bid_index];
        let ask = &self.asks[ask_index];
        let value = execution_price(bid, ask) * quantity;

        let buyer_cash = self.cash_of(bid.agent);
        if buyer_cash < value {
            return false;
        }
        self.cash.insert(bid.agent, buyer_cash - value);
        let seller_cash = self.cash_of(ask.agent);
        self.cash.insert(ask.agent, seller_cash + value);

        *self.taken.entry((Side::Buy, bid_index)).or_insert(0) += quantity;
        *self.taken.entry((Side::Sell, ask_index)).or_insert(0) += quantity;
        true
    }

    fn can_fill(&mut self, side: Side, index: usize) -> bool {
        let opposite = side.opposite();
        let candidate = &self.queue(side)[index];
        let others = self.queue(opposite);

        for j in self.start(opposite)..others.len() {
            let need = self.remaining(side, index);
            if need <= 0 {
                return true;
            }
            let other = &others[j];
            if !candidate.crosses(other) {
                return false;
            }
            let available = self.remaining(opposite, j);
            if available <= 0 {
                continue;
            }

            if !other.kind.is_execute_or_cancel() || available <= need {
                if !self.trade(side, index, j, available.min(need)) && side == Side::Buy {
                    // Live matching moves past a bid it cannot settle.
                    return false;
                }
                continue;
            }

            // The counterparty is all-or-nothing and larger than our need:
            // it only trades if the rest of it can be completed elsewhere.
            let saved = self.snapshot();
            if !self.trade(side, index, j, need) {
                if side == Side::Buy {
                    return false;
                }
                continue;
            }
            if self.can_fill(opposite, j) {
                return true;
            }
            self.restore(saved);
        }

        self.remaining(side, index) <= 0
    }
}
