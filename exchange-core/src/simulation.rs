//! Turn loop tying agents, strategies and order books together.
//!
//! Each turn: shuffle the roster, ask every agent with positive cash for at
//! most one order, route accepted orders to their book, then let every book
//! run its end-of-turn pass in listing order. After the last turn every
//! resting order is cancelled so reserved shares go back to their owners.

use std::collections::{BTreeMap, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::agents::{Agent, Agents};
use crate::config::SimulationConfig;
use crate::error::{OrderError, SimulationError};
use crate::market::{Fill, Market, Order, OrderBook, OrderIntent};
use crate::stats::{AgentSummary, MarketStatistics, Report};
use crate::types::{AgentId, Cash, KeyToU64, Listing, OrderId, Quantity, Side, Symbol, Turn};

pub struct Simulation {
    agents: Agents,
    /// Insertion order; shuffled copies drive each turn.
    roster: Vec<AgentId>,
    shares: Vec<Symbol>,
    books: BTreeMap<Symbol, OrderBook>,
    turn: Turn,
    total_turns: Turn,
    rng: StdRng,
    next_order_id: OrderId,
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(
        agents: Vec<Agent>,
        listings: Vec<Listing>,
        total_turns: Turn,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        validate_listings(&listings)?;
        let listed: HashSet<&str> = listings.iter().map(|l| l.symbol.as_str()).collect();
        for agent in &agents {
            validate_agent(agent, &listed)?;
        }

        let capacity = config.moving_average.history_capacity();
        let books = listings
            .iter()
            .map(|l| (l.symbol.clone(), OrderBook::new(l.symbol.clone(), l.price, capacity)))
            .collect();
        let shares = listings.into_iter().map(|l| l.symbol).collect();

        let mut arena = Agents::with_capacity_and_key(agents.len());
        let roster = agents.into_iter().map(|a| arena.insert(a)).collect();

        Ok(Self {
            agents: arena,
            roster,
            shares,
            books,
            turn: 0,
            total_turns,
            rng: StdRng::seed_from_u64(config.seed),
            next_order_id: 0,
            config,
        })
    }

    // === ACCESSORS ===

    pub fn agents(&self) -> &Agents {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn roster(&self) -> &[AgentId] {
        &self.roster
    }

    /// Listed symbols in listing order.
    pub fn shares(&self) -> &[Symbol] {
        &self.shares
    }

    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn market(&self) -> Market<'_> {
        Market::new(&self.shares, &self.books)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Turns completed so far.
    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn total_turns(&self) -> Turn {
        self.total_turns
    }

    pub fn is_finished(&self) -> bool {
        self.turn >= self.total_turns
    }

    /// Free holdings of every agent plus shares reserved by resting asks.
    pub fn share_supply(&self, symbol: &str) -> Quantity {
        let held: Quantity = self.agents.values().map(|a| a.holding(symbol)).sum();
        held + self.book(symbol).map_or(0, OrderBook::reserved_quantity)
    }

    pub fn total_cash(&self) -> Cash {
        self.agents.values().map(|a| a.cash).sum()
    }

    pub fn statistics(&self) -> MarketStatistics {
        MarketStatistics::collect(self.shares.iter().filter_map(|s| self.books.get(s)))
    }

    /// Final cash and holdings of every agent, in roster order.
    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.roster
            .iter()
            .filter_map(|&id| {
                self.agents.get(id).map(|agent| AgentSummary {
                    id: id.to_u64(),
                    strategy: agent.strategy,
                    cash: agent.cash,
                    holdings: agent.holdings.clone(),
                })
            })
            .collect()
    }

    pub fn report(&self) -> String {
        let agents = self.summaries();
        let statistics = self.statistics();
        Report {
            agents: &agents,
            statistics: &statistics,
        }
        .to_string()
    }

    // === ORDER ENTRY ===

    /// Validate an intent, reserve shares for a sale and queue it in its book.
    ///
    /// `sequence` is the agent's position within the current turn.
    pub fn submit(
        &mut self,
        agent: AgentId,
        intent: OrderIntent,
        sequence: u32,
    ) -> Result<OrderId, OrderError> {
        let book = self
            .books
            .get_mut(&intent.symbol)
            .ok_or_else(|| OrderError::UnknownShare(intent.symbol.clone()))?;
        let owner = self.agents.get_mut(agent).ok_or(OrderError::UnknownAgent)?;
        if intent.price <= 0 {
            return Err(OrderError::NonPositivePrice(intent.price));
        }
        if intent.quantity <= 0 {
            return Err(OrderError::NonPositiveQuantity(intent.quantity));
        }
        if intent.side == Side::Sell {
            owner.reserve(&intent.symbol, intent.quantity)?;
        }

        let id = self.next_order_id;
        self.next_order_id += 1;
        let order = Order::from_intent(id, agent, intent, self.turn, sequence);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "order",
            turn = order.turn,
            order_id = order.id,
            agent_id = agent.to_u64(),
            strategy = owner.strategy.label(),
            symbol = order.symbol.as_str(),
            side = order.side.as_str(),
            kind = order.kind.label(),
            quantity = order.quantity,
            limit_price = order.price,
            sequence = order.sequence,
        );

        book.submit(order);
        Ok(id)
    }

    // === TURN LOOP ===

    /// Play one turn and return the fills it produced, in listing order.
    pub fn run_turn(&mut self) -> Vec<Fill> {
        let mut order = self.roster.clone();
        order.shuffle(&mut self.rng);

        for (sequence, id) in order.into_iter().enumerate() {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            if agent.cash <= 0 {
                continue;
            }
            let market = Market::new(&self.shares, &self.books);
            let intent = agent
                .strategy
                .decide(&mut self.rng, agent, &market, self.turn, &self.config);

            let Some(intent) = intent else {
                continue;
            };
            if let Err(_err) = self.submit(id, intent, sequence as u32) {
                #[cfg(feature = "instrument")]
                tracing::debug!(
                    target: "order",
                    turn = self.turn,
                    agent_id = id.to_u64(),
                    error = %_err,
                    "order refused"
                );
            }
        }

        let mut fills = Vec::new();
        for symbol in &self.shares {
            if let Some(book) = self.books.get_mut(symbol) {
                fills.extend(book.end_of_turn(&mut self.agents).fills);
                book.next_turn();
            }
        }
        self.turn += 1;
        fills
    }

    /// Play every remaining turn, then cancel all resting orders.
    pub fn run(&mut self) -> MarketStatistics {
        while !self.is_finished() {
            self.run_turn();
        }
        self.close();
        self.statistics()
    }

    /// Cancel everything still resting; returns the shares handed back.
    pub fn close(&mut self) -> Quantity {
        self.books
            .values_mut()
            .map(|book| book.close(&mut self.agents))
            .sum()
    }
}

fn validate_listings(listings: &[Listing]) -> Result<(), SimulationError> {
    if listings.is_empty() {
        return Err(SimulationError::NoListings);
    }
    let mut seen = HashSet::new();
    for listing in listings {
        if !seen.insert(listing.symbol.as_str()) {
            return Err(SimulationError::DuplicateListing(listing.symbol.clone()));
        }
        if listing.price <= 0 {
            return Err(SimulationError::NonPositivePrice {
                symbol: listing.symbol.clone(),
                price: listing.price,
            });
        }
    }
    Ok(())
}

fn validate_agent(agent: &Agent, listed: &HashSet<&str>) -> Result<(), SimulationError> {
    if agent.cash < 0 {
        return Err(SimulationError::NegativeCash(agent.cash));
    }
    for (symbol, &quantity) in &agent.holdings {
        if !listed.contains(symbol.as_str()) {
            return Err(SimulationError::UnknownShare(symbol.clone()));
        }
        if quantity < 0 {
            return Err(SimulationError::NegativeHolding {
                symbol: symbol.clone(),
                quantity,
            });
        }
    }
    Ok(())
}
