//! Error types for scenario loading, simulation setup and order submission.
//!
//! Nothing in here escapes the end-of-turn matching pass: settlement failures
//! are reported as [`TradeRejected`] and absorbed by the book.

use thiserror::Error;

use crate::types::{Cash, Price, Quantity, Symbol};

/// Problems found while reading a scenario. Always fatal at load time.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("there is no such investor: {0:?}")]
    UnknownAgentCode(char),

    #[error("malformed listing pair {0:?}, expected SYMBOL:price")]
    MalformedListing(String),

    #[error("malformed holding pair {0:?}, expected SYMBOL:quantity")]
    MalformedHolding(String),

    #[error("holding refers to unlisted share {0:?}")]
    UnknownShare(Symbol),

    #[error("share {0:?} is listed twice")]
    DuplicateListing(Symbol),

    #[error("share {symbol:?} must open at a positive price, got {price}")]
    NonPositivePrice { symbol: Symbol, price: Price },

    #[error("scenario is missing the {0} line")]
    MissingSection(&'static str),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("could not read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode scenario json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inconsistent inputs handed to [`crate::Simulation::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("simulation needs at least one listed share")]
    NoListings,

    #[error("share {0:?} is listed twice")]
    DuplicateListing(Symbol),

    #[error("share {symbol:?} must open at a positive price, got {price}")]
    NonPositivePrice { symbol: Symbol, price: Price },

    #[error("agent holds unlisted share {0:?}")]
    UnknownShare(Symbol),

    #[error("agent starts with negative cash {0}")]
    NegativeCash(Cash),

    #[error("agent starts with negative holding {quantity} of {symbol:?}")]
    NegativeHolding { symbol: Symbol, quantity: Quantity },
}

/// Reasons an order intent is refused before it reaches a book.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("no order book for share {0:?}")]
    UnknownShare(Symbol),

    #[error("agent is not part of this simulation")]
    UnknownAgent,

    #[error("limit price must be positive, got {0}")]
    NonPositivePrice(Price),

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Quantity),

    #[error("cannot reserve {requested} of {symbol:?}, only {held} held")]
    InsufficientHoldings {
        symbol: Symbol,
        requested: Quantity,
        held: Quantity,
    },
}

/// Settlement failure for a single matched pair.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TradeRejected {
    #[error("buyer needs {required} but holds {available}")]
    InsufficientCash { required: Cash, available: Cash },

    #[error("order belongs to an agent outside the book's arena")]
    UnknownAgent,
}
