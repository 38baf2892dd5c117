use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use oilshock_core::domain::contract::parse_intent_value;
use oilshock_core::domain::intent::ParsedIntent;
use oilshock_core::domain::scenario::ScenarioSummary;
use oilshock_core::domain::simulation::SimulationResult;
use oilshock_core::engine::Simulator;
use oilshock_core::llm::{narrate, LlmClient, Narration};
use oilshock_core::model::FittedModel;

use crate::error::ApiError;

const DEFAULT_FORECAST_WEEKS: i64 = 12;
const PRICE_UNIT: &str = "USD/barrel";

#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<dyn FittedModel>>,
    pub simulator: Arc<Simulator>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl AppState {
    fn model(&self) -> Option<&dyn FittedModel> {
        self.model.as_deref()
    }

    fn llm(&self) -> Result<&dyn LlmClient, ApiError> {
        self.llm
            .as_deref()
            .ok_or_else(|| ApiError::unavailable("language model is not configured"))
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct ApiScenarios {
    scenarios: Vec<ScenarioSummary>,
}

pub async fn list_scenarios(State(state): State<AppState>) -> Json<ApiScenarios> {
    Json(ApiScenarios {
        scenarios: state.simulator.catalog().summaries(),
    })
}

#[derive(Debug, Serialize)]
pub struct ApiPrice {
    price: f64,
    date: Option<NaiveDate>,
    unit: &'static str,
}

pub async fn current_price(State(state): State<AppState>) -> Result<Json<ApiPrice>, ApiError> {
    let Some(model) = state.model() else {
        return Err(ApiError::unavailable("forecasting model is not loaded"));
    };
    Ok(Json(ApiPrice {
        price: round2(model.last_price()),
        date: model.last_observed(),
        unit: PRICE_UNIT,
    }))
}

#[derive(Debug, Serialize)]
pub struct WeeklyForecast {
    week: u32,
    baseline: f64,
    scenario: f64,
    change: f64,
}

#[derive(Debug, Serialize)]
pub struct ApiSimulation {
    simulation_id: Uuid,
    generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<ParsedIntent>,
    result: SimulationResult,
    weekly_forecasts: Vec<WeeklyForecast>,
    baseline_mean: Option<f64>,
    scenario_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    narration: Option<Narration>,
}

impl ApiSimulation {
    fn new(result: SimulationResult, intent: Option<ParsedIntent>, narration: Option<Narration>) -> Self {
        let weekly_forecasts = result
            .baseline_trajectory
            .points
            .iter()
            .zip(&result.counterfactual_trajectory.points)
            .map(|(b, s)| WeeklyForecast {
                week: b.week,
                baseline: round2(b.value),
                scenario: round2(s.value),
                change: round2(s.value - b.value),
            })
            .collect();
        let simulation_id = Uuid::new_v4();
        tracing::info!(
            %simulation_id,
            scenario = result.scenario_key(),
            horizon_weeks = result.horizon_weeks,
            narrated = narration.is_some(),
            "simulation served"
        );
        Self {
            simulation_id,
            generated_at: Utc::now(),
            baseline_mean: result.baseline_trajectory.mean().map(round2),
            scenario_mean: result.counterfactual_trajectory.mean().map(round2),
            intent,
            result,
            weekly_forecasts,
            narration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    query: String,
    #[serde(default)]
    forecast_weeks: Option<i64>,
}

/// Free-text question: parse with the language model, simulate, narrate.
pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<ApiSimulation>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query must be non-empty"));
    }
    let llm = state.llm()?;

    let descriptor = llm.parse_intent(query).await.map_err(ApiError::from_llm)?;
    let intent = parse_intent_value(&descriptor)?;
    let weeks = resolve_weeks(req.forecast_weeks, &intent);

    let result = state.simulator.run(state.model(), &intent, weeks)?;
    let narration = narrate(llm, &result, &intent).await;

    Ok(Json(ApiSimulation::new(result, Some(intent), Some(narration))))
}

#[derive(Debug, Deserialize)]
pub struct SimulateDirectRequest {
    scenario_key: String,
    #[serde(default = "default_modifier")]
    magnitude_modifier: f64,
    #[serde(default = "default_weeks")]
    forecast_weeks: i64,
}

fn default_modifier() -> f64 {
    1.0
}

fn default_weeks() -> i64 {
    DEFAULT_FORECAST_WEEKS
}

/// Catalog scenario by key, no language model involved.
pub async fn simulate_direct(
    State(state): State<AppState>,
    Json(req): Json<SimulateDirectRequest>,
) -> Result<Json<ApiSimulation>, ApiError> {
    let result = state.simulator.run_direct(
        state.model(),
        &req.scenario_key,
        req.magnitude_modifier,
        req.forecast_weeks,
    )?;
    Ok(Json(ApiSimulation::new(result, None, None)))
}

#[derive(Debug, Deserialize)]
pub struct SimulateIntentRequest {
    intent: serde_json::Value,
    #[serde(default)]
    forecast_weeks: Option<i64>,
}

/// Pre-parsed intent descriptor. Narrated when a language model is configured.
pub async fn simulate_intent(
    State(state): State<AppState>,
    Json(req): Json<SimulateIntentRequest>,
) -> Result<Json<ApiSimulation>, ApiError> {
    let intent = parse_intent_value(&req.intent)?;
    let weeks = resolve_weeks(req.forecast_weeks, &intent);
    let result = state.simulator.run(state.model(), &intent, weeks)?;

    let narration = match state.llm.as_deref() {
        Some(llm) => Some(narrate(llm, &result, &intent).await),
        None => None,
    };
    Ok(Json(ApiSimulation::new(result, Some(intent), narration)))
}

/// Request field first, then a horizon named in the question, then the default.
fn resolve_weeks(requested: Option<i64>, intent: &ParsedIntent) -> i64 {
    requested
        .or(intent.forecast_weeks.map(i64::from))
        .unwrap_or(DEFAULT_FORECAST_WEEKS)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use oilshock_core::config::EngineConfig;
    use oilshock_core::domain::driver::DriverVector;
    use oilshock_core::engine::ScenarioCatalog;
    use oilshock_core::llm::Provider;
    use oilshock_core::model::{ExogMatrix, ModelError, Prediction};
    use serde_json::json;

    /// Flat price plus a linear response to the drivers.
    struct FlatModel;

    impl FittedModel for FlatModel {
        fn name(&self) -> &str {
            "flat"
        }

        fn last_exog(&self) -> DriverVector {
            DriverVector::ZERO
        }

        fn last_price(&self) -> f64 {
            74.456
        }

        fn last_observed(&self) -> Option<NaiveDate> {
            NaiveDate::from_ymd_opt(2026, 2, 27)
        }

        fn predict(&self, horizon: usize, exog: &ExogMatrix) -> Result<Prediction, ModelError> {
            let mean = (0..horizon)
                .map(|h| 74.0 + exog.row(h).iter().sum::<f64>())
                .collect();
            Ok(Prediction {
                mean,
                std_err: None,
            })
        }
    }

    struct ScriptedLlm {
        descriptor: serde_json::Value,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn parse_intent(&self, _query: &str) -> anyhow::Result<serde_json::Value> {
            Ok(self.descriptor.clone())
        }

        async fn explain_results(
            &self,
            result: &SimulationResult,
            _intent: &ParsedIntent,
        ) -> anyhow::Result<String> {
            Ok(format!("{} explained", result.scenario_key()))
        }

        async fn uncertainty_note(&self, _result: &SimulationResult) -> anyhow::Result<String> {
            Ok("uncertain".to_string())
        }
    }

    fn state(model: bool, llm: Option<serde_json::Value>) -> AppState {
        AppState {
            model: model.then(|| Arc::new(FlatModel) as Arc<dyn FittedModel>),
            simulator: Arc::new(Simulator::new(
                ScenarioCatalog::builtin(),
                &EngineConfig::default(),
            )),
            llm: llm.map(|descriptor| Arc::new(ScriptedLlm { descriptor }) as Arc<dyn LlmClient>),
        }
    }

    fn descriptor(weeks: Option<u32>) -> serde_json::Value {
        json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": 1.5,
            "confidence": "high",
            "reasoning": "major supply cut",
            "forecast_weeks": weeks,
        })
    }

    #[tokio::test]
    async fn scenarios_lists_catalog() {
        let Json(body) = list_scenarios(State(state(false, None))).await;
        assert_eq!(body.scenarios.len(), 5);
    }

    #[tokio::test]
    async fn current_price_requires_model() {
        let err = current_price(State(state(false, None))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);

        let Json(price) = current_price(State(state(true, None))).await.unwrap();
        assert_eq!(price.price, 74.46);
        assert_eq!(price.unit, "USD/barrel");
        assert_eq!(price.date, NaiveDate::from_ymd_opt(2026, 2, 27));
    }

    #[tokio::test]
    async fn direct_run_defaults_to_twelve_weeks() {
        let req: SimulateDirectRequest =
            serde_json::from_value(json!({"scenario_key": "rate_hike"})).unwrap();
        let Json(body) = simulate_direct(State(state(true, None)), Json(req))
            .await
            .unwrap();
        assert_eq!(body.weekly_forecasts.len(), 12);
        assert_eq!(body.result.magnitude_modifier, 1.0);
        assert!(body.narration.is_none());
    }

    #[tokio::test]
    async fn direct_run_maps_engine_errors() {
        let req: SimulateDirectRequest =
            serde_json::from_value(json!({"scenario_key": "nope"})).unwrap();
        let err = simulate_direct(State(state(true, None)), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let req: SimulateDirectRequest =
            serde_json::from_value(json!({"scenario_key": "opec_cut"})).unwrap();
        let err = simulate_direct(State(state(false, None)), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn simulate_needs_language_model() {
        let req = SimulateRequest {
            query: "What if OPEC cuts output?".to_string(),
            forecast_weeks: None,
        };
        let err = simulate(State(state(true, None)), Json(req)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn simulate_rejects_blank_query() {
        let req = SimulateRequest {
            query: "   ".to_string(),
            forecast_weeks: None,
        };
        let err = simulate(State(state(true, Some(descriptor(None)))), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn simulate_uses_horizon_from_question() {
        let req = SimulateRequest {
            query: "Major OPEC cut over 8 weeks".to_string(),
            forecast_weeks: None,
        };
        let Json(body) = simulate(State(state(true, Some(descriptor(Some(8))))), Json(req))
            .await
            .unwrap();
        assert_eq!(body.result.horizon_weeks, 8);
        assert_eq!(body.result.magnitude_modifier, 1.5);
        let narration = body.narration.unwrap();
        assert_eq!(narration.explanation, "opec_cut explained");
        assert_eq!(narration.uncertainty_note, "uncertain");
    }

    #[tokio::test]
    async fn simulate_intent_validates_descriptor() {
        let req = SimulateIntentRequest {
            intent: json!({"scenario_key": "opec_cut"}),
            forecast_weeks: None,
        };
        let err = simulate_intent(State(state(true, None)), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("magnitude_modifier"));
    }

    #[tokio::test]
    async fn simulate_intent_prefers_request_horizon() {
        let req = SimulateIntentRequest {
            intent: descriptor(Some(8)),
            forecast_weeks: Some(4),
        };
        let Json(body) = simulate_intent(State(state(true, None)), Json(req))
            .await
            .unwrap();
        assert_eq!(body.weekly_forecasts.len(), 4);
        assert!(body.narration.is_none());
        assert!(body.intent.is_some());
    }
}
