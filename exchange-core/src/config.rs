use serde::{Deserialize, Serialize};

// === SIMULATION CONFIG ===

/// Tunables for a simulation run. Every field has a default so a partial
/// JSON object is enough to override one knob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the simulation's random source (shuffles and strategies).
    pub seed: u64,
    pub randomization: RandomizationConfig,
    pub moving_average: MovingAverageConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            randomization: RandomizationConfig::default(),
            moving_average: MovingAverageConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Ranges used by the randomization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomizationConfig {
    /// Random prices fall within `last_price ± price_band` (floored at 1).
    pub price_band: i64,
    /// Turn-based orders stay eligible for `0..=max_turn_based_lifetime` extra turns.
    pub max_turn_based_lifetime: u32,
}

impl Default for RandomizationConfig {
    fn default() -> Self {
        Self {
            price_band: 10,
            max_turn_based_lifetime: 10,
        }
    }
}

/// Parameters of the moving-average crossover strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageConfig {
    pub short_period: usize,
    pub long_period: usize,
    /// How many turns back the "previous" averages are taken from. Clamped
    /// to the oldest price on record.
    pub crossover_lag: usize,
    /// Turns during which the strategy trades randomly.
    pub warmup_turns: u32,
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self {
            short_period: 5,
            long_period: 10,
            crossover_lag: 10,
            warmup_turns: 10,
        }
    }
}

impl MovingAverageConfig {
    /// Number of per-turn prices a book keeps: the long window plus the
    /// price before it.
    pub fn history_capacity(&self) -> usize {
        self.long_period.max(self.short_period) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_history_holds_eleven_prices() {
        assert_eq!(MovingAverageConfig::default().history_capacity(), 11);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"seed": 7, "randomization": {"price_band": 3}}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.randomization.price_band, 3);
        assert_eq!(config.randomization.max_turn_based_lifetime, 10);
        assert_eq!(config.moving_average, MovingAverageConfig::default());
    }
}
