use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::agents::Agents;
use crate::error::TradeRejected;
use crate::stats::KindCounts;
use crate::types::{Price, Quantity, Side, Symbol, Turn};

use super::feasibility;
use super::history::PriceHistory;
use super::orders::{Fill, Order, execution_price};

// === COUNTERS ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCounters {
    pub transactions: u64,
    pub purchases: KindCounts,
    pub sales: KindCounts,
    pub expired: u64,
    pub cancelled: u64,
    pub rejected: u64,
}

/// What one end-of-turn pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    pub fills: Vec<Fill>,
    pub expired: usize,
    pub cancelled: usize,
    pub rejected: usize,
}

// === PRIORITY ===

/// Bids: higher price first. Asks: lower price first. Then earlier
/// (turn, sequence) first on both sides.
pub fn priority_order(side: Side, a: &Order, b: &Order) -> Ordering {
    let by_price = match side {
        Side::Buy => b.price.cmp(&a.price),
        Side::Sell => a.price.cmp(&b.price),
    };
    by_price.then_with(|| a.priority().cmp(&b.priority()))
}

// === ORDER BOOK ===

/// Bid and ask queues for one share plus its trading record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    symbol: Symbol,
    turn: Turn,
    bids: Vec<Order>,
    asks: Vec<Order>,
    last_price: Price,
    history: PriceHistory,
    counters: BookCounters,
}

impl OrderBook {
    pub fn new(symbol: impl Into<Symbol>, opening_price: Price, history_capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            turn: 0,
            bids: Vec::new(),
            asks: Vec::new(),
            last_price: opening_price,
            history: PriceHistory::new(opening_price, history_capacity),
            counters: BookCounters::default(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn last_price(&self) -> Price {
        self.last_price
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn counters(&self) -> &BookCounters {
        &self.counters
    }

    pub fn transactions(&self) -> u64 {
        self.counters.transactions
    }

    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    pub fn queue(&self, side: Side) -> &[Order] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Shares held back by resting sell orders.
    pub fn reserved_quantity(&self) -> Quantity {
        self.asks.iter().map(|o| o.quantity.max(0)).sum()
    }

    pub fn average_of_last(&self, n: usize) -> Option<f64> {
        self.history.average_of_last(n)
    }

    pub fn average_of_last_from(&self, n: usize, k: usize) -> Option<f64> {
        self.history.average_of_last_from(n, k)
    }

    /// Queue an order. Sell-side shares must already be reserved.
    pub fn submit(&mut self, order: Order) {
        match order.side {
            Side::Buy => self.bids.push(order),
            Side::Sell => self.asks.push(order),
        }
    }

    /// Move the book to the next turn. Call after [`OrderBook::end_of_turn`].
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    /// Whether the order at `index` on `side` can be filled in full against
    /// the current queues, starting from the given matching cursors.
    pub fn is_feasible(
        &self,
        agents: &Agents,
        side: Side,
        index: usize,
        cursors: (usize, usize),
    ) -> bool {
        feasibility::is_feasible(&self.bids, &self.asks, agents, cursors, side, index)
    }

    /// Run the end-of-turn pass: purge, sort, match, record the price.
    pub fn end_of_turn(&mut self, agents: &mut Agents) -> TurnOutcome {
        let mut outcome = TurnOutcome {
            expired: self.purge_expired(agents),
            ..TurnOutcome::default()
        };
        self.sort_queues();
        self.match_crossing(agents, &mut outcome);
        self.bids.retain(|o| !o.is_terminal());
        self.asks.retain(|o| !o.is_terminal());
        self.history.record(self.last_price);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "turn",
            turn = self.turn,
            symbol = self.symbol.as_str(),
            last_price = self.last_price,
            fills = outcome.fills.len() as u64,
            expired = outcome.expired as u64,
            cancelled = outcome.cancelled as u64,
            rejected = outcome.rejected as u64,
            resting_bids = self.bids.len() as u64,
            resting_asks = self.asks.len() as u64,
        );

        outcome
    }

    /// Cancel everything still resting. Used once the simulation is over.
    pub fn close(&mut self, agents: &mut Agents) -> Quantity {
        let mut released = 0;
        for order in self.bids.iter_mut().chain(self.asks.iter_mut()) {
            released += order.cancel(agents);
        }
        self.bids.clear();
        self.asks.clear();
        released
    }

    pub fn sort_queues(&mut self) {
        self.bids.sort_by(|a, b| priority_order(Side::Buy, a, b));
        self.asks.sort_by(|a, b| priority_order(Side::Sell, a, b));
    }

    fn purge_expired(&mut self, agents: &mut Agents) -> usize {
        let turn = self.turn;
        let mut expired = 0;
        for order in self.bids.iter_mut().chain(self.asks.iter_mut()) {
            if order.is_terminal() || order.is_eligible(turn) {
                continue;
            }
            let _released = order.cancel(agents);
            expired += 1;

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "expiry",
                turn = turn,
                symbol = order.symbol.as_str(),
                order_id = order.id,
                side = order.side.as_str(),
                kind = order.kind.label(),
                released = _released,
            );
        }
        self.bids.retain(|o| !o.is_terminal());
        self.asks.retain(|o| !o.is_terminal());
        self.counters.expired += expired as u64;
        expired
    }

    fn match_crossing(&mut self, agents: &mut Agents, outcome: &mut TurnOutcome) {
        let (mut b, mut a) = (0, 0);

        while b < self.bids.len() && a < self.asks.len() {
            if self.bids[b].is_terminal() {
                b += 1;
                continue;
            }
            if self.asks[a].is_terminal() {
                a += 1;
                continue;
            }
            if self.bids[b].price < self.asks[a].price {
                break;
            }

            if self.bids[b].kind.is_execute_or_cancel()
                && !self.is_feasible(agents, Side::Buy, b, (b, a))
            {
                self.cancel_unfillable(Side::Buy, b, agents, outcome);
                b += 1;
                continue;
            }
            if self.asks[a].kind.is_execute_or_cancel()
                && !self.is_feasible(agents, Side::Sell, a, (b, a))
            {
                self.cancel_unfillable(Side::Sell, a, agents, outcome);
                a += 1;
                continue;
            }

            let quantity = self.bids[b].quantity.min(self.asks[a].quantity);
            match settle(&self.bids[b], &self.asks[a], quantity, self.turn, agents) {
                Ok(fill) => {
                    self.bids[b].quantity -= quantity;
                    self.asks[a].quantity -= quantity;
                    self.record_fill(b, a, fill, outcome);
                    if self.bids[b].is_terminal() {
                        b += 1;
                    }
                    if self.asks[a].is_terminal() {
                        a += 1;
                    }
                }
                Err(_reason) => {
                    // The bid keeps resting; retry it next turn.
                    self.counters.rejected += 1;
                    outcome.rejected += 1;

                    #[cfg(feature = "instrument")]
                    tracing::info!(
                        target: "reject",
                        turn = self.turn,
                        symbol = self.symbol.as_str(),
                        buy_order = self.bids[b].id,
                        sell_order = self.asks[a].id,
                        reason = %_reason,
                    );

                    b += 1;
                }
            }
        }
    }

    fn cancel_unfillable(
        &mut self,
        side: Side,
        index: usize,
        agents: &mut Agents,
        outcome: &mut TurnOutcome,
    ) {
        let order = match side {
            Side::Buy => &mut self.bids[index],
            Side::Sell => &mut self.asks[index],
        };
        let _released = order.cancel(agents);
        self.counters.cancelled += 1;
        outcome.cancelled += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "cancel",
            turn = self.turn,
            symbol = self.symbol.as_str(),
            order_id = order.id,
            side = side.as_str(),
            released = _released,
        );
    }

    fn record_fill(&mut self, b: usize, a: usize, fill: Fill, outcome: &mut TurnOutcome) {
        self.last_price = fill.price;
        self.counters.transactions += 1;
        self.counters.purchases.bump(self.bids[b].kind);
        self.counters.sales.bump(self.asks[a].kind);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "trade",
            turn = fill.turn,
            symbol = fill.symbol.as_str(),
            buy_order = fill.buy_order,
            sell_order = fill.sell_order,
            buy_kind = self.bids[b].kind.label(),
            sell_kind = self.asks[a].kind.label(),
            quantity = fill.quantity,
            price = fill.price,
        );

        outcome.fills.push(fill);
    }
}

/// Move cash and shares for one matched pair, or change nothing at all.
///
/// The seller's shares were reserved when the ask was created, so only the
/// buyer's holding changes here.
pub fn settle(
    bid: &Order,
    ask: &Order,
    quantity: Quantity,
    turn: Turn,
    agents: &mut Agents,
) -> Result<Fill, TradeRejected> {
    let price = execution_price(bid, ask);
    let value = price * quantity;

    let buyer = agents.get(bid.agent).ok_or(TradeRejected::UnknownAgent)?;
    if !agents.contains_key(ask.agent) {
        return Err(TradeRejected::UnknownAgent);
    }
    if !buyer.can_afford(value) {
        return Err(TradeRejected::InsufficientCash {
            required: value,
            available: buyer.cash,
        });
    }

    let buyer = &mut agents[bid.agent];
    buyer.cash -= value;
    buyer.release(&bid.symbol, quantity);
    agents[ask.agent].cash += value;

    Ok(Fill {
        turn,
        symbol: bid.symbol.clone(),
        buy_order: bid.id,
        sell_order: ask.id,
        buyer: bid.agent,
        seller: ask.agent,
        quantity,
        price,
    })
}
