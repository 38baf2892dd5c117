use crate::domain::driver::ShockVector;
use crate::domain::intent::Confidence;
use crate::domain::scenario::ScenarioDefinition;
use crate::domain::trajectory::Trajectory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price impact at one checkpoint week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub baseline: f64,
    pub shocked: f64,
    pub difference: f64,
    /// `None` when the baseline is exactly zero; serialized as `null`.
    pub pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: ScenarioDefinition,
    pub scenario_name: String,
    /// Modifier actually applied, after clamping.
    pub magnitude_modifier: f64,
    pub shock_vector: ShockVector,
    pub current_price: f64,
    pub last_observed: Option<NaiveDate>,
    pub horizon_weeks: u32,
    pub baseline_trajectory: Trajectory,
    pub counterfactual_trajectory: Trajectory,
    pub impacts: BTreeMap<u32, ImpactSummary>,
    pub impact_week1: Option<ImpactSummary>,
    pub impact_week12: Option<ImpactSummary>,
    pub impact_final: ImpactSummary,
    pub confidence: Option<Confidence>,
    pub reasoning: Option<String>,
}

impl SimulationResult {
    pub fn scenario_key(&self) -> &str {
        &self.scenario.key
    }
}
