//! Random draws shared by every strategy.
//!
//! All functions take the random source explicitly so a seeded simulation
//! replays exactly.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::agents::Agent;
use crate::config::RandomizationConfig;
use crate::market::{Market, OrderIntent, OrderKind};
use crate::types::{Price, Quantity, Side, Symbol, Turn};

/// Uniform pick among the listed shares.
pub fn random_share<'a, R: Rng + ?Sized>(rng: &mut R, market: &Market<'a>) -> Option<&'a Symbol> {
    market.shares().choose(rng)
}

/// Uniform in `[last - band, last + band]`, never below 1.
pub fn random_price<R: Rng + ?Sized>(rng: &mut R, last_price: Price, band: i64) -> Price {
    let band = band.max(0);
    let low = (last_price - band).max(1);
    let high = (last_price + band).max(low);
    rng.random_range(low..=high)
}

/// `None` when not even one share is affordable at `price`.
pub fn random_quantity_to_buy<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    price: Price,
) -> Option<Quantity> {
    if price <= 0 {
        return None;
    }
    let affordable = agent.cash / price;
    (affordable >= 1).then(|| rng.random_range(1..=affordable))
}

/// `None` when nothing of `symbol` is held.
pub fn random_quantity_to_sell<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    symbol: &str,
) -> Option<Quantity> {
    let held = agent.holding(symbol);
    (held >= 1).then(|| rng.random_range(1..=held))
}

/// One of the four lifetimes with equal odds.
pub fn random_kind<R: Rng + ?Sized>(
    rng: &mut R,
    turn: Turn,
    config: &RandomizationConfig,
) -> OrderKind {
    match rng.random_range(0..4) {
        0 => OrderKind::Immediate,
        1 => OrderKind::OpenEnded,
        2 => OrderKind::TurnBased {
            last_turn: turn + rng.random_range(0..=config.max_turn_based_lifetime),
        },
        _ => OrderKind::ExecuteOrCancel,
    }
}

pub fn random_sale<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    market: &Market<'_>,
    symbol: &str,
    turn: Turn,
    config: &RandomizationConfig,
) -> Option<OrderIntent> {
    let last_price = market.last_price(symbol)?;
    let quantity = random_quantity_to_sell(rng, agent, symbol)?;
    let price = random_price(rng, last_price, config.price_band);
    Some(OrderIntent {
        symbol: symbol.to_string(),
        side: Side::Sell,
        quantity,
        price,
        kind: random_kind(rng, turn, config),
    })
}

pub fn random_purchase<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    market: &Market<'_>,
    symbol: &str,
    turn: Turn,
    config: &RandomizationConfig,
) -> Option<OrderIntent> {
    let last_price = market.last_price(symbol)?;
    let price = random_price(rng, last_price, config.price_band);
    let quantity = random_quantity_to_buy(rng, agent, price)?;
    Some(OrderIntent {
        symbol: symbol.to_string(),
        side: Side::Buy,
        quantity,
        price,
        kind: random_kind(rng, turn, config),
    })
}

/// Random share; sell some of it when held, otherwise try to buy it.
pub fn random_intent<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    market: &Market<'_>,
    turn: Turn,
    config: &RandomizationConfig,
) -> Option<OrderIntent> {
    let symbol = random_share(rng, market)?;
    if agent.holding(symbol) > 0 {
        random_sale(rng, agent, market, symbol, turn, config)
    } else {
        random_purchase(rng, agent, market, symbol, turn, config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::agents::Strategy;
    use crate::market::OrderBook;

    fn books(listings: &[(&str, Price)]) -> (Vec<Symbol>, BTreeMap<Symbol, OrderBook>) {
        let shares: Vec<Symbol> = listings.iter().map(|(s, _)| s.to_string()).collect();
        let books = listings
            .iter()
            .map(|&(s, p)| (s.to_string(), OrderBook::new(s, p, 11)))
            .collect();
        (shares, books)
    }

    #[test]
    fn price_stays_in_band_and_positive() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let p = random_price(&mut rng, 100, 10);
            assert!((90..=110).contains(&p), "price {p} outside band");
            let low = random_price(&mut rng, 3, 10);
            assert!((1..=13).contains(&low), "price {low} not floored at 1");
        }
    }

    #[test]
    fn buy_quantity_respects_cash() {
        let mut rng = StdRng::seed_from_u64(2);
        let agent = Agent::new(500, Strategy::Random);
        for _ in 0..200 {
            let q = random_quantity_to_buy(&mut rng, &agent, 50).unwrap();
            assert!((1..=10).contains(&q));
        }
        assert_eq!(random_quantity_to_buy(&mut rng, &agent, 501), None);
    }

    #[test]
    fn sell_quantity_never_exceeds_holding() {
        let mut rng = StdRng::seed_from_u64(3);
        let agent = Agent::new(0, Strategy::Random).with_holding("AAPL", 4);
        for _ in 0..200 {
            let q = random_quantity_to_sell(&mut rng, &agent, "AAPL").unwrap();
            assert!((1..=4).contains(&q));
        }
        assert_eq!(random_quantity_to_sell(&mut rng, &agent, "MSFT"), None);
    }

    #[test]
    fn turn_based_horizon_is_bounded() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = RandomizationConfig::default();
        let mut seen_all = [false; 4];
        for _ in 0..500 {
            match random_kind(&mut rng, 7, &config) {
                OrderKind::Immediate => seen_all[0] = true,
                OrderKind::OpenEnded => seen_all[1] = true,
                OrderKind::TurnBased { last_turn } => {
                    seen_all[2] = true;
                    assert!((7..=17).contains(&last_turn));
                }
                OrderKind::ExecuteOrCancel => seen_all[3] = true,
            }
        }
        assert!(seen_all.iter().all(|&s| s), "every kind should come up");
    }

    #[test]
    fn holder_sells_and_non_holder_buys() {
        let mut rng = StdRng::seed_from_u64(5);
        let (shares, books) = books(&[("AAPL", 100)]);
        let market = Market::new(&shares, &books);
        let config = RandomizationConfig::default();

        let holder = Agent::new(0, Strategy::Random).with_holding("AAPL", 3);
        let intent = random_intent(&mut rng, &holder, &market, 0, &config).unwrap();
        assert_eq!(intent.side, Side::Sell);
        assert!(intent.quantity <= 3);

        let buyer = Agent::new(10_000, Strategy::Random);
        let intent = random_intent(&mut rng, &buyer, &market, 0, &config).unwrap();
        assert_eq!(intent.side, Side::Buy);
        assert!(intent.quantity * intent.price <= 10_000);
    }

    #[test]
    fn broke_agent_without_shares_stays_out() {
        let mut rng = StdRng::seed_from_u64(6);
        let (shares, books) = books(&[("AAPL", 100)]);
        let market = Market::new(&shares, &books);
        let agent = Agent::new(50, Strategy::Random);
        assert_eq!(
            random_intent(&mut rng, &agent, &market, 0, &RandomizationConfig::default()),
            None
        );
    }

    #[test]
    fn empty_market_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        let (shares, books) = books(&[]);
        let market = Market::new(&shares, &books);
        assert!(random_share(&mut rng, &market).is_none());
    }
}
