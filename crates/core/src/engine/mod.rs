pub mod catalog;
pub mod error;
pub mod forecast;
pub mod impact;
pub mod orchestrator;
pub mod shock;

pub use catalog::ScenarioCatalog;
pub use error::{ForecastLeg, SimulationError};
pub use orchestrator::Simulator;

use crate::domain::scenario::ScenarioSummary;
use crate::domain::simulation::SimulationResult;
use crate::model::FittedModel;

/// Direct mode: run a catalog scenario at a given magnitude with default engine
/// settings.
pub fn run_simulation(
    model: Option<&dyn FittedModel>,
    scenario_key: &str,
    magnitude_modifier: f64,
    horizon_weeks: i64,
) -> Result<SimulationResult, SimulationError> {
    Simulator::default().run_direct(model, scenario_key, magnitude_modifier, horizon_weeks)
}

/// Run from an intent descriptor produced by the language model.
pub fn run_simulation_from_intent(
    model: Option<&dyn FittedModel>,
    intent_descriptor: &serde_json::Value,
    horizon_weeks: i64,
) -> Result<SimulationResult, SimulationError> {
    Simulator::default().run_from_descriptor(model, intent_descriptor, horizon_weeks)
}

pub fn list_scenarios() -> Vec<ScenarioSummary> {
    ScenarioCatalog::builtin().summaries()
}
