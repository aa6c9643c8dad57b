use wasm_bindgen::prelude::*;

pub mod agents;
pub mod config;
pub mod error;
pub mod market;
pub mod randomization;
pub mod scenario;
pub mod simulation;
pub mod stats;
pub mod types;

pub use agents::{Agent, Agents, Strategy};
pub use config::*;
pub use error::*;
pub use market::{Fill, Market, Order, OrderBook, OrderIntent, OrderKind, PriceHistory};
pub use scenario::Scenario;
pub use simulation::Simulation;
pub use stats::*;
pub use types::*;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Exchange
// ============================================================================

#[wasm_bindgen]
pub struct Exchange {
    simulation: Simulation,
}

#[wasm_bindgen]
impl Exchange {
    /// Build from a scenario object. `config` may be `undefined` or a
    /// partial `SimulationConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(scenario: Scenario, turns: u32, config: JsValue) -> Result<Exchange, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        scenario.validate()?;
        let config = if config.is_undefined() || config.is_null() {
            SimulationConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            simulation: scenario.into_simulation(turns, config)?,
        })
    }

    /// Build from the text scenario format.
    #[wasm_bindgen]
    pub fn from_text(text: &str, turns: u32, seed: u64) -> Result<Exchange, JsError> {
        console_error_panic_hook::set_once();

        let scenario = Scenario::parse(text)?;
        Ok(Self {
            simulation: scenario.into_simulation(turns, SimulationConfig::default().with_seed(seed))?,
        })
    }

    /// Play every remaining turn, close the books and return the totals.
    #[wasm_bindgen]
    pub fn run(&mut self) -> MarketStatistics {
        self.simulation.run()
    }

    /// Play a single turn; returns the number of fills.
    #[wasm_bindgen]
    pub fn advance_turn(&mut self) -> u32 {
        if self.simulation.is_finished() {
            return 0;
        }
        self.simulation.run_turn().len() as u32
    }

    #[wasm_bindgen]
    pub fn get_turn(&self) -> u32 {
        self.simulation.turn()
    }

    #[wasm_bindgen]
    pub fn is_finished(&self) -> bool {
        self.simulation.is_finished()
    }

    #[wasm_bindgen]
    pub fn get_statistics(&self) -> MarketStatistics {
        self.simulation.statistics()
    }

    /// Per-agent cash and holdings, in scenario order.
    #[wasm_bindgen]
    pub fn get_agents(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(&self.simulation.summaries())?)
    }

    #[wasm_bindgen]
    pub fn get_last_prices(&self) -> Result<JsValue, JsError> {
        let market = self.simulation.market();
        let prices: Vec<(String, Price)> = self
            .simulation
            .shares()
            .iter()
            .filter_map(|s| market.last_price(s).map(|p| (s.clone(), p)))
            .collect();
        Ok(serde_wasm_bindgen::to_value(&prices)?)
    }

    /// Plain-text report of the final state.
    #[wasm_bindgen]
    pub fn report(&self) -> String {
        self.simulation.report()
    }
}
