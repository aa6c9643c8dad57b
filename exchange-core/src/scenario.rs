//! Scenario files: who trades, what is listed, what everyone starts with.
//!
//! Text layout, `#` lines are comments and blank lines are skipped:
//!
//! ```text
//! R R S S R
//! APL:145 MSFT:300 GOOGL:2700
//! 100000 APL:5 MSFT:15 GOOGL:3
//! ```
//!
//! One letter per agent (`R` random, `S` moving average), then the listed
//! shares with their opening prices, then the starting cash and holdings
//! every agent receives.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::agents::{Agent, Strategy};
use crate::config::SimulationConfig;
use crate::error::{ScenarioError, SimulationError};
use crate::simulation::Simulation;
use crate::types::{Cash, Listing, Quantity, Symbol, Turn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
pub struct Scenario {
    /// One entry per agent, in file order.
    pub agents: Vec<Strategy>,
    pub listings: Vec<Listing>,
    pub cash: Cash,
    pub holdings: BTreeMap<Symbol, Quantity>,
}

impl Scenario {
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let agents = parse_agents(lines.next().ok_or(ScenarioError::MissingSection("agents"))?)?;
        let listings =
            parse_listings(lines.next().ok_or(ScenarioError::MissingSection("listings"))?)?;
        let (cash, holdings) = parse_holdings(
            lines.next().ok_or(ScenarioError::MissingSection("holdings"))?,
            &listings,
        )?;

        let scenario = Self {
            agents,
            listings,
            cash,
            holdings,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut listed = HashSet::new();
        for listing in &self.listings {
            if !listed.insert(listing.symbol.as_str()) {
                return Err(ScenarioError::DuplicateListing(listing.symbol.clone()));
            }
            if listing.price <= 0 {
                return Err(ScenarioError::NonPositivePrice {
                    symbol: listing.symbol.clone(),
                    price: listing.price,
                });
            }
        }
        if self.cash < 0 {
            return Err(ScenarioError::InvalidNumber(self.cash.to_string()));
        }
        for (symbol, &quantity) in &self.holdings {
            if !listed.contains(symbol.as_str()) {
                return Err(ScenarioError::UnknownShare(symbol.clone()));
            }
            if quantity < 0 {
                return Err(ScenarioError::InvalidNumber(quantity.to_string()));
            }
        }
        Ok(())
    }

    /// Every agent gets its own copy of the shared starting cash and holdings.
    pub fn build_agents(&self) -> Vec<Agent> {
        self.agents
            .iter()
            .map(|&strategy| Agent {
                cash: self.cash,
                holdings: self.holdings.clone(),
                strategy,
            })
            .collect()
    }

    pub fn into_simulation(
        self,
        turns: Turn,
        config: SimulationConfig,
    ) -> Result<Simulation, SimulationError> {
        let agents = self.build_agents();
        Simulation::new(agents, self.listings, turns, config)
    }
}

impl FromStr for Scenario {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_agents(line: &str) -> Result<Vec<Strategy>, ScenarioError> {
    line.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| Strategy::from_code(c).ok_or(ScenarioError::UnknownAgentCode(c)))
        .collect()
}

fn parse_listings(line: &str) -> Result<Vec<Listing>, ScenarioError> {
    line.split_whitespace()
        .map(|pair| {
            let (symbol, price) =
                split_pair(pair).ok_or_else(|| ScenarioError::MalformedListing(pair.to_string()))?;
            Ok(Listing::new(symbol, parse_number(price)?))
        })
        .collect()
}

fn parse_holdings(
    line: &str,
    listings: &[Listing],
) -> Result<(Cash, BTreeMap<Symbol, Quantity>), ScenarioError> {
    let mut tokens = line.split_whitespace();
    let cash = parse_number(tokens.next().ok_or(ScenarioError::MissingSection("cash"))?)?;

    let mut holdings = BTreeMap::new();
    for pair in tokens {
        let (symbol, quantity) =
            split_pair(pair).ok_or_else(|| ScenarioError::MalformedHolding(pair.to_string()))?;
        if !listings.iter().any(|l| l.symbol == symbol) {
            return Err(ScenarioError::UnknownShare(symbol.to_string()));
        }
        holdings.insert(symbol.to_string(), parse_number(quantity)?);
    }
    Ok((cash, holdings))
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (left, right) = pair.split_once(':')?;
    if left.is_empty() || right.is_empty() || right.contains(':') {
        return None;
    }
    Some((left, right))
}

fn parse_number(token: &str) -> Result<i64, ScenarioError> {
    token
        .parse()
        .map_err(|_| ScenarioError::InvalidNumber(token.to_string()))
}
