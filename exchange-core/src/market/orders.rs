use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::Agents;
use crate::types::{AgentId, OrderId, Price, Quantity, Side, Symbol, Turn};

// === ORDER KINDS ===

/// Lifetime policy of an order. Expiry data lives inline in the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum OrderKind {
    /// Rests until filled or the simulation ends.
    OpenEnded,
    /// Eligible only in the matching pass of its submission turn.
    Immediate,
    /// Eligible up to and including `last_turn`.
    TurnBased { last_turn: Turn },
    /// Like `Immediate`, but fills completely or not at all.
    ExecuteOrCancel,
}

impl OrderKind {
    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::OpenEnded => "OpenEndedOrder",
            OrderKind::Immediate => "ImmediateOrder",
            OrderKind::TurnBased { .. } => "TurnBasedOrder",
            OrderKind::ExecuteOrCancel => "ExecuteOrCancelOrder",
        }
    }

    pub fn is_execute_or_cancel(&self) -> bool {
        matches!(self, OrderKind::ExecuteOrCancel)
    }
}

// === ORDER INTENT ===

/// What a strategy wants to trade. The driver stamps turn, sequence and id
/// when it turns an intent into an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub kind: OrderKind,
}

// === ORDERS ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub agent: AgentId,
    pub symbol: Symbol,
    pub side: Side,
    /// Remaining quantity; only ever decreases.
    pub quantity: Quantity,
    pub price: Price,
    pub turn: Turn,
    /// Position of the submitting agent within its turn.
    pub sequence: u32,
    pub kind: OrderKind,
}

impl Order {
    pub fn from_intent(
        id: OrderId,
        agent: AgentId,
        intent: OrderIntent,
        turn: Turn,
        sequence: u32,
    ) -> Self {
        Self {
            id,
            agent,
            symbol: intent.symbol,
            side: intent.side,
            quantity: intent.quantity,
            price: intent.price,
            turn,
            sequence,
            kind: intent.kind,
        }
    }

    /// Time priority key: earlier turn first, then earlier position in turn.
    pub fn priority(&self) -> (Turn, u32) {
        (self.turn, self.sequence)
    }

    pub fn is_terminal(&self) -> bool {
        self.quantity <= 0
    }

    /// Whether the order may still take part in matching at `current_turn`.
    pub fn is_eligible(&self, current_turn: Turn) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self.kind {
            OrderKind::OpenEnded => true,
            OrderKind::Immediate | OrderKind::ExecuteOrCancel => current_turn <= self.turn,
            OrderKind::TurnBased { last_turn } => current_turn <= last_turn,
        }
    }

    /// Does this order's limit accept a trade against `other`?
    pub fn crosses(&self, other: &Order) -> bool {
        match self.side {
            Side::Buy => self.price >= other.price,
            Side::Sell => self.price <= other.price,
        }
    }

    /// Retire the order, handing any still-reserved shares back to the owner.
    ///
    /// Returns the released quantity. Zeroing the quantity makes a second
    /// call a no-op, so a reservation is never returned twice.
    pub fn cancel(&mut self, agents: &mut Agents) -> Quantity {
        let remaining = self.quantity.max(0);
        self.quantity = 0;
        if self.side == Side::Sell && remaining > 0 {
            if let Some(agent) = agents.get_mut(self.agent) {
                agent.release(&self.symbol, remaining);
            }
            remaining
        } else {
            0
        }
    }
}

/// Price the trade executes at: the strictly earlier order sets it, a true
/// tie goes to the ask.
pub fn execution_price(bid: &Order, ask: &Order) -> Price {
    if bid.priority() < ask.priority() {
        bid.price
    } else {
        ask.price
    }
}

// === FILLS ===

/// A committed transaction between a resting bid and ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub turn: Turn,
    pub symbol: Symbol,
    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub buyer: AgentId,
    pub seller: AgentId,
    pub quantity: Quantity,
    pub price: Price,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, Strategy};

    fn order(side: Side, kind: OrderKind, turn: Turn, agent: AgentId) -> Order {
        Order {
            id: 0,
            agent,
            symbol: "AAPL".to_string(),
            side,
            quantity: 3,
            price: 50,
            turn,
            sequence: 0,
            kind,
        }
    }

    #[test]
    fn eligibility_follows_kind() {
        let agent = AgentId::default();
        let open = order(Side::Buy, OrderKind::OpenEnded, 2, agent);
        let immediate = order(Side::Buy, OrderKind::Immediate, 2, agent);
        let eoc = order(Side::Buy, OrderKind::ExecuteOrCancel, 2, agent);
        let turn_based = order(Side::Buy, OrderKind::TurnBased { last_turn: 4 }, 2, agent);

        assert!(open.is_eligible(100));
        assert!(immediate.is_eligible(2));
        assert!(!immediate.is_eligible(3));
        assert!(eoc.is_eligible(2));
        assert!(!eoc.is_eligible(3));
        assert!(turn_based.is_eligible(4));
        assert!(!turn_based.is_eligible(5));
    }

    #[test]
    fn empty_order_is_never_eligible() {
        let mut open = order(Side::Buy, OrderKind::OpenEnded, 0, AgentId::default());
        open.quantity = 0;
        assert!(!open.is_eligible(0));
    }

    #[test]
    fn execution_price_prefers_earlier_order() {
        let agent = AgentId::default();
        let mut bid = order(Side::Buy, OrderKind::OpenEnded, 1, agent);
        bid.price = 60;
        let mut ask = order(Side::Sell, OrderKind::OpenEnded, 1, agent);
        ask.price = 55;
        ask.sequence = 1;
        assert_eq!(execution_price(&bid, &ask), 60);

        ask.turn = 0;
        assert_eq!(execution_price(&bid, &ask), 55);

        ask.turn = 1;
        ask.sequence = 0;
        assert_eq!(execution_price(&bid, &ask), 55, "true tie uses the ask");
    }

    #[test]
    fn cancel_releases_sell_reservation_once() {
        let mut agents = Agents::with_key();
        let id = agents.insert(Agent::new(100, Strategy::Random).with_holding("AAPL", 10));
        agents[id].reserve("AAPL", 3).unwrap();

        let mut sell = order(Side::Sell, OrderKind::OpenEnded, 0, id);
        assert_eq!(sell.cancel(&mut agents), 3);
        assert_eq!(sell.cancel(&mut agents), 0);
        assert_eq!(agents[id].holding("AAPL"), 10);
    }

    #[test]
    fn cancel_of_buy_releases_nothing() {
        let mut agents = Agents::with_key();
        let id = agents.insert(Agent::new(100, Strategy::Random));
        let mut buy = order(Side::Buy, OrderKind::Immediate, 0, id);
        assert_eq!(buy.cancel(&mut agents), 0);
        assert!(buy.is_terminal());
        assert_eq!(agents[id].holding("AAPL"), 0);
    }
}
