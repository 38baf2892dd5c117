use crate::domain::driver::ShockVector;
use crate::domain::trajectory::Trajectory;
use crate::engine::error::ForecastLeg;
use crate::engine::SimulationError;
use crate::model::sarimax::Z_95;
use crate::model::{ExogMatrix, FittedModel, ModelError};

/// Drives a fitted model over a flat exogenous path, optionally shocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastEngine {
    max_horizon_weeks: u32,
}

impl ForecastEngine {
    pub fn new(max_horizon_weeks: u32) -> Self {
        Self { max_horizon_weeks }
    }

    pub fn check_horizon(&self, horizon_weeks: i64) -> Result<u32, SimulationError> {
        if horizon_weeks < 1 || horizon_weeks > i64::from(self.max_horizon_weeks) {
            return Err(SimulationError::InvalidHorizon {
                horizon: horizon_weeks,
                max: self.max_horizon_weeks,
            });
        }
        Ok(horizon_weeks as u32)
    }

    /// Without a shock (or with an all-zero one) this is the baseline: exogenous
    /// inputs held at their last observed values for the whole horizon. A shock
    /// is added to every week, modelling a regime shift rather than an impulse.
    pub fn forecast(
        &self,
        model: &dyn FittedModel,
        horizon_weeks: i64,
        shock: Option<&ShockVector>,
    ) -> Result<Trajectory, SimulationError> {
        let horizon = self.check_horizon(horizon_weeks)? as usize;

        let shock = shock.filter(|s| !s.is_zero());
        let leg = match shock {
            Some(_) => ForecastLeg::Counterfactual,
            None => ForecastLeg::Baseline,
        };

        let last = model.last_exog();
        let row = match shock {
            Some(s) => last.plus(s),
            None => last,
        };
        let exog = ExogMatrix::flat(&row, horizon);

        let prediction = model
            .predict(horizon, &exog)
            .map_err(|source| SimulationError::ForecastComputation { leg, source })?;

        if prediction.mean.len() != horizon {
            return Err(SimulationError::ForecastComputation {
                leg,
                source: ModelError::Numerical {
                    detail: format!(
                        "model returned {} values for a horizon of {horizon}",
                        prediction.mean.len()
                    ),
                },
            });
        }

        tracing::debug!(
            model = model.name(),
            %leg,
            horizon,
            last = prediction.mean.last().copied(),
            "forecast computed"
        );

        let trajectory = Trajectory::from_values(&prediction.mean);
        Ok(match prediction.std_err {
            Some(se) if se.len() == horizon => {
                let lower: Vec<f64> = prediction
                    .mean
                    .iter()
                    .zip(&se)
                    .map(|(m, s)| m - Z_95 * s)
                    .collect();
                let upper: Vec<f64> = prediction
                    .mean
                    .iter()
                    .zip(&se)
                    .map(|(m, s)| m + Z_95 * s)
                    .collect();
                trajectory.with_interval(&lower, &upper)
            }
            _ => trajectory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::driver::DriverVector;
    use crate::engine::testing::LinearModel;

    #[test]
    fn baseline_has_requested_length_and_weeks() {
        let model = LinearModel::default();
        let t = ForecastEngine::new(52).forecast(&model, 7, None).unwrap();
        assert_eq!(t.len(), 7);
        let weeks: Vec<_> = t.points.iter().map(|p| p.week).collect();
        assert_eq!(weeks, (1..=7).collect::<Vec<u32>>());
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn zero_shock_is_the_baseline() {
        let model = LinearModel::default();
        let engine = ForecastEngine::new(52);
        let base = engine.forecast(&model, 12, None).unwrap();
        let zero = engine
            .forecast(&model, 12, Some(&DriverVector::ZERO))
            .unwrap();
        assert_eq!(base, zero);
    }

    #[test]
    fn shock_is_applied_to_every_week() {
        let model = LinearModel::default();
        let engine = ForecastEngine::new(52);
        let shock = DriverVector {
            vix_diff: 2.0,
            ..DriverVector::ZERO
        };
        let base = engine.forecast(&model, 4, None).unwrap();
        let cf = engine.forecast(&model, 4, Some(&shock)).unwrap();
        for (b, c) in base.values().zip(cf.values()) {
            assert!((c - b - 2.0 * model.beta[4]).abs() < 1e-12);
        }
    }

    #[test]
    fn horizon_bounds_are_enforced_before_predicting() {
        let model = LinearModel::default();
        let engine = ForecastEngine::new(52);
        for bad in [0, -4, 53] {
            assert!(matches!(
                engine.forecast(&model, bad, None),
                Err(SimulationError::InvalidHorizon { .. })
            ));
        }
        assert_eq!(model.calls(), 0);
        assert!(engine.forecast(&model, 52, None).is_ok());
    }

    #[test]
    fn model_failure_is_wrapped_with_leg() {
        let model = LinearModel {
            fail_with: Some(ModelError::Numerical {
                detail: "boom".to_string(),
            }),
            ..LinearModel::default()
        };
        let shock = DriverVector {
            inventory_pct: -1.0,
            ..DriverVector::ZERO
        };
        let err = ForecastEngine::new(52)
            .forecast(&model, 3, Some(&shock))
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::ForecastComputation {
                leg: ForecastLeg::Counterfactual,
                ..
            }
        ));
    }

    #[test]
    fn interval_brackets_mean_when_model_reports_errors() {
        let model = LinearModel {
            std_err: Some(1.0),
            ..LinearModel::default()
        };
        let t = ForecastEngine::new(52).forecast(&model, 3, None).unwrap();
        let interval = t.interval.as_ref().unwrap();
        for (p, band) in t.points.iter().zip(interval) {
            assert!(band.lower < p.value && p.value < band.upper);
            assert!((band.upper - band.lower - 2.0 * Z_95).abs() < 1e-9);
        }
    }
}
