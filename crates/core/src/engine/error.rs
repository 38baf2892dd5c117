//! Error taxonomy for scenario simulation.
//!
//! Client-side failures (bad key, malformed intent, horizon out of range) are
//! distinguished from server-side ones (model missing or failing) so the API
//! layer can map them onto status codes without inspecting messages.

use crate::model::ModelError;
use std::fmt;
use thiserror::Error;

/// Which of the two forecast runs failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastLeg {
    Baseline,
    Counterfactual,
}

impl fmt::Display for ForecastLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastLeg::Baseline => f.write_str("baseline"),
            ForecastLeg::Counterfactual => f.write_str("counterfactual"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("unknown scenario {key:?} (available: {})", available.join(", "))]
    UnknownScenario { key: String, available: Vec<String> },

    #[error("invalid intent descriptor: field `{field}`: {detail}")]
    IntentValidation { field: &'static str, detail: String },

    #[error("invalid forecast horizon {horizon} weeks (must be 1..={max})")]
    InvalidHorizon { horizon: i64, max: u32 },

    #[error("{leg} forecast failed: {source}")]
    ForecastComputation {
        leg: ForecastLeg,
        #[source]
        source: ModelError,
    },

    #[error("forecasting model unavailable: {reason}")]
    ModelUnavailable { reason: String },
}

impl SimulationError {
    pub fn intent(field: &'static str, detail: impl Into<String>) -> Self {
        SimulationError::IntentValidation {
            field,
            detail: detail.into(),
        }
    }

    /// True for failures caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SimulationError::UnknownScenario { .. }
                | SimulationError::IntentValidation { .. }
                | SimulationError::InvalidHorizon { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scenario_lists_available_keys() {
        let err = SimulationError::UnknownScenario {
            key: "not_a_real_scenario".to_string(),
            available: vec!["opec_cut".to_string(), "rate_hike".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("not_a_real_scenario"));
        assert!(msg.contains("opec_cut, rate_hike"));
        assert!(err.is_client_error());
    }

    #[test]
    fn forecast_failure_is_server_side_and_keeps_source() {
        let err = SimulationError::ForecastComputation {
            leg: ForecastLeg::Counterfactual,
            source: ModelError::ExogShape {
                expected: 5,
                got: 4,
            },
        };
        assert!(!err.is_client_error());
        assert_eq!(
            err.to_string(),
            "counterfactual forecast failed: exogenous matrix has 4 columns, model expects 5"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(
            source.downcast_ref::<ModelError>(),
            Some(&ModelError::ExogShape {
                expected: 5,
                got: 4
            })
        );
    }

    #[test]
    fn model_unavailable_is_not_client_error() {
        let err = SimulationError::ModelUnavailable {
            reason: "MODEL_PATH not set".to_string(),
        };
        assert!(!err.is_client_error());
    }
}
