pub mod moving_average;
pub mod random;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::config::SimulationConfig;
use crate::error::OrderError;
use crate::market::{Market, OrderIntent};
use crate::types::{AgentId, Cash, Quantity, Symbol, Turn};

pub use moving_average::*;
pub use random::*;

/// Arena owning every agent of a simulation. Orders refer to agents by key.
pub type Agents = SlotMap<AgentId, Agent>;

// === STRATEGY ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Strategy {
    Random,
    MovingAverage,
}

impl Strategy {
    /// One-letter code used by scenario files.
    pub fn from_code(code: char) -> Option<Strategy> {
        match code {
            'R' => Some(Strategy::Random),
            'S' => Some(Strategy::MovingAverage),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Random => "RANDOM",
            Strategy::MovingAverage => "SMA",
        }
    }

    /// Decide this turn's order, if any. Pure apart from the random draws.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        agent: &Agent,
        market: &Market<'_>,
        turn: Turn,
        config: &SimulationConfig,
    ) -> Option<OrderIntent> {
        match self {
            Strategy::Random => random_decision(rng, agent, market, turn, &config.randomization),
            Strategy::MovingAverage => moving_average_decision(
                rng,
                agent,
                market,
                turn,
                &config.randomization,
                &config.moving_average,
            ),
        }
    }
}

// === AGENT ===

/// An investor: cash, free (unreserved) holdings and a strategy.
///
/// Shares promised to resting sell orders are not counted in `holdings`;
/// they come back through [`Agent::release`] or leave through a fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub cash: Cash,
    pub holdings: BTreeMap<Symbol, Quantity>,
    pub strategy: Strategy,
}

impl Agent {
    pub fn new(cash: Cash, strategy: Strategy) -> Self {
        Self {
            cash,
            holdings: BTreeMap::new(),
            strategy,
        }
    }

    pub fn with_holding(mut self, symbol: impl Into<Symbol>, quantity: Quantity) -> Self {
        self.holdings.insert(symbol.into(), quantity);
        self
    }

    pub fn holding(&self, symbol: &str) -> Quantity {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    /// Set aside shares for a sell order.
    pub fn reserve(&mut self, symbol: &str, quantity: Quantity) -> Result<(), OrderError> {
        let held = self.holding(symbol);
        if quantity > held {
            return Err(OrderError::InsufficientHoldings {
                symbol: symbol.to_string(),
                requested: quantity,
                held,
            });
        }
        self.holdings.insert(symbol.to_string(), held - quantity);
        Ok(())
    }

    /// Give back shares reserved by a sell order that will not fill.
    pub fn release(&mut self, symbol: &str, quantity: Quantity) {
        *self.holdings.entry(symbol.to_string()).or_insert(0) += quantity;
    }

    pub fn can_afford(&self, value: Cash) -> bool {
        self.cash >= value
    }
}
