//! Simple-moving-average crossover trader.

use rand::Rng;

use crate::config::{MovingAverageConfig, RandomizationConfig};
use crate::market::{Market, OrderIntent, PriceHistory};
use crate::randomization::{random_intent, random_purchase, random_sale};
use crate::types::Turn;

use super::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Short average moved above the long one.
    Bullish,
    /// Short average moved below the long one.
    Bearish,
}

/// Short and long averages at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub short: f64,
    pub long: f64,
}

impl Averages {
    fn at(history: &PriceHistory, config: &MovingAverageConfig, lag: usize) -> Option<Self> {
        Some(Self {
            short: history.average_of_last_from(config.short_period, lag)?,
            long: history.average_of_last_from(config.long_period, lag)?,
        })
    }
}

/// Compare the current averages with those `crossover_lag` turns back, or
/// with the oldest price on record when the history is shorter.
///
/// No signal until the history holds a full long window.
pub fn crossover(history: &PriceHistory, config: &MovingAverageConfig) -> Option<Signal> {
    if !history.covers(config.long_period.max(config.short_period), 0) {
        return None;
    }
    let lag = config.crossover_lag.min(history.len() - 1);
    let now = Averages::at(history, config, 0)?;
    let before = Averages::at(history, config, lag)?;

    if before.short <= before.long && now.short > now.long {
        Some(Signal::Bullish)
    } else if before.short >= before.long && now.short < now.long {
        Some(Signal::Bearish)
    } else {
        None
    }
}

/// Trade randomly during warmup, then follow the first share (in listing
/// order) showing a crossover.
pub fn moving_average_decision<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    market: &Market<'_>,
    turn: Turn,
    randomization: &RandomizationConfig,
    config: &MovingAverageConfig,
) -> Option<OrderIntent> {
    if turn < config.warmup_turns {
        return random_intent(rng, agent, market, turn, randomization);
    }

    for symbol in market.shares() {
        let Some(history) = market.history(symbol) else {
            continue;
        };
        let intent = match crossover(history, config) {
            Some(Signal::Bearish) if agent.holding(symbol) > 0 => {
                random_sale(rng, agent, market, symbol, turn, randomization)
            }
            Some(Signal::Bullish) => {
                random_purchase(rng, agent, market, symbol, turn, randomization)
            }
            _ => None,
        };
        if intent.is_some() {
            return intent;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::agents::Strategy;
    use crate::market::OrderBook;
    use crate::types::{Price, Side, Symbol};

    fn history(prices: &[Price], capacity: usize) -> PriceHistory {
        let mut h = PriceHistory::new(prices[0], capacity);
        for &p in &prices[1..] {
            h.record(p);
        }
        h
    }

    #[test]
    fn first_jump_after_flat_run_is_bullish() {
        let config = MovingAverageConfig::default();
        let mut prices = vec![1; 10];
        prices.push(10);
        assert_eq!(crossover(&history(&prices, 11), &config), Some(Signal::Bullish));
    }

    #[test]
    fn first_drop_after_flat_run_is_bearish() {
        let config = MovingAverageConfig::default();
        let mut prices = vec![10; 10];
        prices.push(1);
        assert_eq!(crossover(&history(&prices, 11), &config), Some(Signal::Bearish));
    }

    #[test]
    fn five_ones_then_five_tens_is_bullish() {
        let config = MovingAverageConfig::default();
        let mut prices = vec![1; 5];
        prices.extend([10; 5]);
        let h = history(&prices, config.history_capacity());

        assert_eq!(h.len(), 10);
        assert_eq!(h.average_of_last(5), Some(10.0));
        assert_eq!(h.average_of_last(10), Some(5.5));
        assert_eq!(crossover(&h, &config), Some(Signal::Bullish));
    }

    #[test]
    fn crossover_looks_back_to_the_oldest_price() {
        let config = MovingAverageConfig::default();
        let mut prices = vec![1; 6];
        prices.extend([10; 5]);
        let h = history(&prices, config.history_capacity());

        assert_eq!(h.len(), 11);
        assert_eq!(h.average_of_last_from(5, 10), Some(1.0));
        assert_eq!(h.average_of_last_from(10, 10), Some(1.0));
        assert_eq!(crossover(&h, &config), Some(Signal::Bullish));
    }

    #[test]
    fn equal_averages_give_no_signal() {
        let config = MovingAverageConfig::default();
        assert_eq!(crossover(&history(&[100; 11], 11), &config), None);

        // Short and long both average 2 now.
        let prices = [7, 2, 2, 2, 2, 2, 1, 3, 1, 3, 2];
        let h = history(&prices, 11);
        assert_eq!(h.average_of_last(5), h.average_of_last(10));
        assert_eq!(crossover(&h, &config), None);
    }

    #[test]
    fn short_history_gives_no_signal() {
        let config = MovingAverageConfig::default();
        assert_eq!(crossover(&history(&[1, 1, 1, 10], 11), &config), None);
    }

    fn market_after(prices: &[Price]) -> (Vec<Symbol>, BTreeMap<Symbol, OrderBook>) {
        let mut book = OrderBook::new("AAPL", prices[0], 11);
        let mut agents = crate::agents::Agents::with_key();
        for &p in &prices[1..] {
            // Replay the closing prices through trades of one share.
            let seller = agents.insert(Agent::new(0, Strategy::Random).with_holding("AAPL", 1));
            let buyer = agents.insert(Agent::new(p, Strategy::Random));
            agents[seller].reserve("AAPL", 1).unwrap();
            for (id, side, sequence) in [(buyer, Side::Buy, 0), (seller, Side::Sell, 1)] {
                book.submit(crate::market::Order {
                    id: 0,
                    agent: id,
                    symbol: "AAPL".to_string(),
                    side,
                    quantity: 1,
                    price: p,
                    turn: book.turn(),
                    sequence,
                    kind: crate::market::OrderKind::Immediate,
                });
            }
            book.end_of_turn(&mut agents);
            book.next_turn();
        }
        let mut books = BTreeMap::new();
        books.insert("AAPL".to_string(), book);
        (vec!["AAPL".to_string()], books)
    }

    #[test]
    fn bullish_crossover_emits_purchase() {
        let mut prices = vec![1; 10];
        prices.push(10);
        let (shares, books) = market_after(&prices);
        let market = Market::new(&shares, &books);
        let agent = Agent::new(10_000, Strategy::MovingAverage);
        let mut rng = StdRng::seed_from_u64(11);

        let intent = moving_average_decision(
            &mut rng,
            &agent,
            &market,
            10,
            &RandomizationConfig::default(),
            &MovingAverageConfig::default(),
        )
        .expect("crossover turn should trade");
        assert_eq!(intent.side, Side::Buy);
        assert_eq!(intent.symbol, "AAPL");
    }

    #[test]
    fn bearish_crossover_without_holdings_stays_out() {
        let mut prices = vec![10; 10];
        prices.push(1);
        let (shares, books) = market_after(&prices);
        let market = Market::new(&shares, &books);
        let agent = Agent::new(10_000, Strategy::MovingAverage);
        let mut rng = StdRng::seed_from_u64(12);

        let intent = moving_average_decision(
            &mut rng,
            &agent,
            &market,
            10,
            &RandomizationConfig::default(),
            &MovingAverageConfig::default(),
        );
        assert_eq!(intent, None);

        let holder = agent.with_holding("AAPL", 3);
        let intent = moving_average_decision(
            &mut rng,
            &holder,
            &market,
            10,
            &RandomizationConfig::default(),
            &MovingAverageConfig::default(),
        )
        .unwrap();
        assert_eq!(intent.side, Side::Sell);
    }

    #[test]
    fn warmup_trades_randomly() {
        let (shares, books) = market_after(&[100]);
        let market = Market::new(&shares, &books);
        let agent = Agent::new(10_000, Strategy::MovingAverage);
        let mut rng = StdRng::seed_from_u64(13);

        let intent = moving_average_decision(
            &mut rng,
            &agent,
            &market,
            0,
            &RandomizationConfig::default(),
            &MovingAverageConfig::default(),
        );
        assert!(intent.is_some(), "warmup should fall back to random orders");
    }
}
