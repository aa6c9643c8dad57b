use rand::Rng;

use crate::config::RandomizationConfig;
use crate::market::{Market, OrderIntent};
use crate::randomization::random_intent;
use crate::types::Turn;

use super::Agent;

/// Random trader: every turn, a random order on a random share.
pub fn random_decision<R: Rng + ?Sized>(
    rng: &mut R,
    agent: &Agent,
    market: &Market<'_>,
    turn: Turn,
    config: &RandomizationConfig,
) -> Option<OrderIntent> {
    random_intent(rng, agent, market, turn, config)
}
