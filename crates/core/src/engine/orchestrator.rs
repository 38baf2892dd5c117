use crate::config::EngineConfig;
use crate::domain::contract::parse_intent_value;
use crate::domain::intent::ParsedIntent;
use crate::domain::scenario::ScenarioDefinition;
use crate::domain::simulation::SimulationResult;
use crate::engine::catalog::ScenarioCatalog;
use crate::engine::forecast::ForecastEngine;
use crate::engine::impact::{compute_impact, impact_between};
use crate::engine::shock::ShockBuilder;
use crate::engine::SimulationError;
use crate::model::FittedModel;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Composes catalog lookup, shock construction, the two forecast runs and the
/// impact reduction into one synchronous call.
///
/// Holds no model: the caller lends one per call and it is only read.
#[derive(Debug, Clone)]
pub struct Simulator {
    catalog: Arc<ScenarioCatalog>,
    shocks: ShockBuilder,
    engine: ForecastEngine,
    checkpoints: BTreeSet<u32>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(ScenarioCatalog::builtin(), &EngineConfig::default())
    }
}

impl Simulator {
    pub fn new(catalog: Arc<ScenarioCatalog>, config: &EngineConfig) -> Self {
        Self {
            catalog,
            shocks: ShockBuilder::from_config(config),
            engine: ForecastEngine::new(config.max_horizon_weeks),
            checkpoints: config.checkpoints.iter().copied().collect(),
        }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Run from an intent already validated into a [`ParsedIntent`].
    pub fn run(
        &self,
        model: Option<&dyn FittedModel>,
        intent: &ParsedIntent,
        horizon_weeks: i64,
    ) -> Result<SimulationResult, SimulationError> {
        let scenario = self.catalog.lookup(&intent.scenario_key)?;
        self.execute(
            model,
            scenario,
            intent.magnitude_modifier,
            horizon_weeks,
            Some(intent),
        )
    }

    /// Run from the raw descriptor emitted by the intent parser.
    pub fn run_from_descriptor(
        &self,
        model: Option<&dyn FittedModel>,
        descriptor: &serde_json::Value,
        horizon_weeks: i64,
    ) -> Result<SimulationResult, SimulationError> {
        let intent = parse_intent_value(descriptor)?;
        self.run(model, &intent, horizon_weeks)
    }

    /// Run a catalog scenario at a given magnitude, skipping intent parsing.
    pub fn run_direct(
        &self,
        model: Option<&dyn FittedModel>,
        scenario_key: &str,
        magnitude_modifier: f64,
        horizon_weeks: i64,
    ) -> Result<SimulationResult, SimulationError> {
        let scenario = self.catalog.lookup(scenario_key)?;
        self.execute(model, scenario, magnitude_modifier, horizon_weeks, None)
    }

    fn execute(
        &self,
        model: Option<&dyn FittedModel>,
        scenario: &ScenarioDefinition,
        magnitude_modifier: f64,
        horizon_weeks: i64,
        intent: Option<&ParsedIntent>,
    ) -> Result<SimulationResult, SimulationError> {
        let horizon = self.engine.check_horizon(horizon_weeks)?;
        let model = ready_model(model)?;
        let shock = self.shocks.build(scenario, magnitude_modifier)?;

        tracing::info!(
            scenario = %scenario.key,
            model = model.name(),
            modifier = shock.modifier,
            horizon,
            "running scenario simulation"
        );

        let baseline = self.engine.forecast(model, horizon_weeks, None)?;
        let counterfactual = self
            .engine
            .forecast(model, horizon_weeks, Some(&shock.vector))?;

        let impacts = compute_impact(&baseline, &counterfactual, &self.checkpoints);

        // Both trajectories are non-empty: the horizon was checked above and the
        // engine rejects length mismatches.
        let final_week = baseline.last().map(|p| p.value).unwrap_or_default();
        let final_shocked = counterfactual.last().map(|p| p.value).unwrap_or_default();
        let impact_final = impact_between(final_week, final_shocked);

        tracing::info!(
            scenario = %scenario.key,
            difference = impact_final.difference,
            pct_change = impact_final.pct_change,
            "scenario simulation finished"
        );

        Ok(SimulationResult {
            scenario: scenario.clone(),
            scenario_name: scenario.display_name.clone(),
            magnitude_modifier: shock.modifier,
            shock_vector: shock.vector,
            current_price: model.last_price(),
            last_observed: model.last_observed(),
            horizon_weeks: horizon,
            impact_week1: impacts.get(&1).copied(),
            impact_week12: impacts.get(&12).copied(),
            impacts,
            impact_final,
            baseline_trajectory: baseline,
            counterfactual_trajectory: counterfactual,
            confidence: intent.map(|i| i.confidence),
            reasoning: intent.map(|i| i.reasoning.clone()),
        })
    }
}

fn ready_model(model: Option<&dyn FittedModel>) -> Result<&dyn FittedModel, SimulationError> {
    let model = model.ok_or_else(|| SimulationError::ModelUnavailable {
        reason: "no fitted model loaded".to_string(),
    })?;
    if !model.is_ready() {
        return Err(SimulationError::ModelUnavailable {
            reason: format!("model {} is not ready", model.name()),
        });
    }
    Ok(model)
}
