//! Fitted SARIMAX artifact: regression on the exogenous drivers with
//! seasonal ARIMA errors.
//!
//! The artifact is produced by the offline trainer. This module only loads it and
//! runs the forecast recursion; no parameter is ever estimated here.
//!
//! Model, with `L` the lag operator and `s` the seasonal period:
//!
//! ```text
//! y_t = c + β·x_t + u_t
//! φ(L) Φ(L^s) (1 - L)^d u_t = θ(L) Θ(L^s) ε_t
//! ```
//!
//! Forecasts set future innovations to zero. Standard errors come from the
//! ψ-weights of the integrated ARMA polynomial.

use crate::domain::driver::{Driver, DriverVector};
use crate::model::{ExogMatrix, FittedModel, ModelError, Prediction};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_MAX_HORIZON: usize = 520;

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarimaxArtifact {
    pub name: String,
    /// (p, d, q)
    pub order: [usize; 3],
    /// (P, D, Q, s). Seasonal differencing is not supported, D must be 0.
    pub seasonal_order: [usize; 4],
    #[serde(default)]
    pub ar: Vec<f64>,
    #[serde(default)]
    pub ma: Vec<f64>,
    #[serde(default)]
    pub seasonal_ar: Vec<f64>,
    #[serde(default)]
    pub seasonal_ma: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    pub exog_names: Vec<String>,
    pub exog_coefficients: Vec<f64>,
    pub sigma2: f64,
    pub history: HistoryTail,
    pub last_exog: BTreeMap<String, f64>,
    pub last_price: f64,
    #[serde(default)]
    pub last_observed: Option<NaiveDate>,
    #[serde(default)]
    pub max_horizon: Option<usize>,
}

/// End of the training history, oldest value first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryTail {
    /// Differenced error series `(1 - L)^d u_t`.
    #[serde(default)]
    pub w: Vec<f64>,
    /// In-sample one-step innovations `ε_t`.
    #[serde(default)]
    pub residuals: Vec<f64>,
    /// Undifferenced error levels `u_t`, at least `d` of them.
    #[serde(default)]
    pub levels: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SarimaxModel {
    name: String,
    d: usize,
    /// `a_k` in `w_t = Σ a_k w_{t-k} + ...`; index 0 unused.
    ar_lags: Vec<f64>,
    /// `b_k` in `... + ε_t + Σ b_k ε_{t-k}`; index 0 is 1.
    ma_poly: Vec<f64>,
    /// AR lags of the integrated polynomial, for ψ-weights.
    integrated_ar_lags: Vec<f64>,
    intercept: f64,
    beta: Vec<f64>,
    sigma2: f64,
    history: HistoryTail,
    last_exog: DriverVector,
    last_price: f64,
    last_observed: Option<NaiveDate>,
    max_horizon: usize,
}

impl SarimaxModel {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let model = Self::from_json(&text)
            .with_context(|| format!("failed to load model artifact {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            model = %model.name,
            max_horizon = model.max_horizon,
            "model artifact loaded"
        );
        Ok(model)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let artifact = serde_json::from_str::<SarimaxArtifact>(text)
            .map_err(|e| invalid(format!("not a SARIMAX artifact: {e}")))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(a: SarimaxArtifact) -> Result<Self, ModelError> {
        let [p, d, q] = a.order;
        let [sp, sd, sq, s] = a.seasonal_order;

        check(a.ar.len() == p, || format!("ar has {} coefficients, order p={p}", a.ar.len()))?;
        check(a.ma.len() == q, || format!("ma has {} coefficients, order q={q}", a.ma.len()))?;
        check(a.seasonal_ar.len() == sp, || {
            format!("seasonal_ar has {} coefficients, order P={sp}", a.seasonal_ar.len())
        })?;
        check(a.seasonal_ma.len() == sq, || {
            format!("seasonal_ma has {} coefficients, order Q={sq}", a.seasonal_ma.len())
        })?;
        check(sd == 0, || format!("seasonal differencing D={sd} is not supported"))?;
        check(d <= 2, || format!("differencing order d={d} is not supported"))?;
        check(sp + sq == 0 || s >= 2, || format!("seasonal period s={s} must be >= 2"))?;

        let expected: Vec<&str> = Driver::ALL.iter().map(|d| d.as_str()).collect();
        check(a.exog_names == expected, || {
            format!("exog_names must be {expected:?} (got {:?})", a.exog_names)
        })?;
        check(a.exog_coefficients.len() == a.exog_names.len(), || {
            format!(
                "{} exog coefficients for {} exog names",
                a.exog_coefficients.len(),
                a.exog_names.len()
            )
        })?;

        let mut last = [0.0; Driver::COUNT];
        for (i, driver) in Driver::ALL.into_iter().enumerate() {
            last[i] = *a
                .last_exog
                .get(driver.as_str())
                .ok_or_else(|| invalid(format!("last_exog is missing {driver}")))?;
        }

        let scalars = [a.intercept, a.sigma2, a.last_price];
        let mut numbers = a
            .ar
            .iter()
            .chain(&a.ma)
            .chain(&a.seasonal_ar)
            .chain(&a.seasonal_ma)
            .chain(&a.exog_coefficients)
            .chain(&a.history.w)
            .chain(&a.history.residuals)
            .chain(&a.history.levels)
            .chain(&last)
            .chain(&scalars);
        check(numbers.all(|v| v.is_finite()), || {
            "artifact contains non-finite values".to_string()
        })?;
        check(a.sigma2 >= 0.0, || format!("sigma2 must be >= 0 (got {})", a.sigma2))?;

        let ar_poly = poly_mul(&lag_poly(&a.ar, 1, -1.0), &lag_poly(&a.seasonal_ar, s, -1.0));
        let ma_poly = poly_mul(&lag_poly(&a.ma, 1, 1.0), &lag_poly(&a.seasonal_ma, s, 1.0));
        let mut integrated = ar_poly.clone();
        for _ in 0..d {
            integrated = poly_mul(&integrated, &[1.0, -1.0]);
        }

        let ar_order = ar_poly.len() - 1;
        let ma_order = ma_poly.len() - 1;
        check(a.history.w.len() >= ar_order, || {
            format!("history.w needs {ar_order} values (got {})", a.history.w.len())
        })?;
        check(a.history.residuals.len() >= ma_order, || {
            format!(
                "history.residuals needs {ma_order} values (got {})",
                a.history.residuals.len()
            )
        })?;
        check(a.history.levels.len() >= d, || {
            format!("history.levels needs {d} values (got {})", a.history.levels.len())
        })?;

        let max_horizon = a.max_horizon.unwrap_or(DEFAULT_MAX_HORIZON);
        check(max_horizon >= 1, || "max_horizon must be >= 1".to_string())?;

        Ok(Self {
            name: a.name,
            d,
            ar_lags: ar_poly.iter().map(|c| -c).collect(),
            ma_poly,
            integrated_ar_lags: integrated.iter().map(|c| -c).collect(),
            intercept: a.intercept,
            beta: a.exog_coefficients,
            sigma2: a.sigma2,
            history: a.history,
            last_exog: DriverVector::from_array(last),
            last_price: a.last_price,
            last_observed: a.last_observed,
            max_horizon,
        })
    }

    fn forecast_w(&self, horizon: usize) -> Vec<f64> {
        let p = self.ar_lags.len() - 1;
        let q = self.ma_poly.len() - 1;

        let hist_w = &self.history.w[self.history.w.len() - p..];
        let hist_e = &self.history.residuals[self.history.residuals.len() - q..];

        let mut w = Vec::with_capacity(p + horizon);
        w.extend_from_slice(hist_w);

        for h in 0..horizon {
            let t = p + h;
            let mut next = 0.0;
            for k in 1..=p {
                next += self.ar_lags[k] * w[t - k];
            }
            // Only innovations already observed contribute; future ones are zero.
            for k in (h + 1)..=q {
                next += self.ma_poly[k] * hist_e[q + h - k];
            }
            w.push(next);
        }

        w.split_off(p)
    }

    fn integrate(&self, w: Vec<f64>) -> Vec<f64> {
        if self.d == 0 {
            return w;
        }
        let d = self.d;
        let mut u: Vec<f64> = self.history.levels[self.history.levels.len() - d..].to_vec();
        for wt in &w {
            let t = u.len();
            let mut next = *wt;
            for k in 1..=d {
                let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
                next += sign * binomial(d, k) * u[t - k];
            }
            u.push(next);
        }
        u.split_off(d)
    }

    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        let a = &self.integrated_ar_lags;
        let mut psi = Vec::with_capacity(horizon);
        psi.push(1.0);
        for j in 1..horizon {
            let mut v = self.ma_poly.get(j).copied().unwrap_or(0.0);
            for k in 1..a.len().min(j + 1) {
                v += a[k] * psi[j - k];
            }
            psi.push(v);
        }
        psi
    }

    fn std_errors(&self, horizon: usize) -> Vec<f64> {
        let mut acc = 0.0;
        self.psi_weights(horizon)
            .into_iter()
            .map(|psi| {
                acc += psi * psi;
                (self.sigma2 * acc).sqrt()
            })
            .collect()
    }
}

impl FittedModel for SarimaxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_exog(&self) -> DriverVector {
        self.last_exog
    }

    fn last_price(&self) -> f64 {
        self.last_price
    }

    fn last_observed(&self) -> Option<NaiveDate> {
        self.last_observed
    }

    fn predict(&self, horizon: usize, exog: &ExogMatrix) -> Result<Prediction, ModelError> {
        if horizon == 0 || horizon > self.max_horizon {
            return Err(ModelError::UnsupportedHorizon {
                horizon,
                max: self.max_horizon,
            });
        }
        if exog.width() != self.beta.len() {
            return Err(ModelError::ExogShape {
                expected: self.beta.len(),
                got: exog.width(),
            });
        }
        if exog.rows() != horizon {
            return Err(ModelError::ExogRows {
                horizon,
                got: exog.rows(),
            });
        }

        let u = self.integrate(self.forecast_w(horizon));
        let mean: Vec<f64> = u
            .iter()
            .enumerate()
            .map(|(h, ut)| {
                let reg: f64 = self.beta.iter().zip(exog.row(h)).map(|(b, x)| b * x).sum();
                self.intercept + reg + ut
            })
            .collect();

        if let Some(h) = mean.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::Numerical {
                detail: format!("non-finite forecast at step {}", h + 1),
            });
        }

        Ok(Prediction {
            mean,
            std_err: Some(self.std_errors(horizon)),
        })
    }
}

/// `1 + sign * Σ c_i L^(i * step)`.
fn lag_poly(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut out = vec![0.0; coefs.len() * step + 1];
    out[0] = 1.0;
    for (i, c) in coefs.iter().enumerate() {
        out[(i + 1) * step] = sign * c;
    }
    out
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn invalid(detail: String) -> ModelError {
    ModelError::InvalidArtifact { detail }
}

fn check(cond: bool, detail: impl FnOnce() -> String) -> Result<(), ModelError> {
    if cond {
        Ok(())
    } else {
        Err(invalid(detail()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(overrides: serde_json::Value) -> serde_json::Value {
        let mut base = json!({
            "name": "test",
            "order": [0, 0, 0],
            "seasonal_order": [0, 0, 0, 0],
            "intercept": 0.0,
            "exog_names": ["dollar_return", "indpro_return", "inventory_pct", "fed_funds_diff", "vix_diff"],
            "exog_coefficients": [0.0, 0.0, 0.0, 0.0, 0.0],
            "sigma2": 1.0,
            "history": {"w": [], "residuals": [], "levels": []},
            "last_exog": {
                "dollar_return": 0.0,
                "indpro_return": 0.0,
                "inventory_pct": 0.0,
                "fed_funds_diff": 0.0,
                "vix_diff": 0.0
            },
            "last_price": 80.0,
        });
        for (k, v) in overrides.as_object().unwrap() {
            base[k] = v.clone();
        }
        base
    }

    fn load(overrides: serde_json::Value) -> Result<SarimaxModel, ModelError> {
        SarimaxModel::from_json(&artifact(overrides).to_string())
    }

    fn flat(model: &SarimaxModel, horizon: usize) -> ExogMatrix {
        ExogMatrix::flat(&model.last_exog(), horizon)
    }

    #[test]
    fn ar1_with_regression_matches_hand_computation() {
        let model = load(json!({
            "order": [1, 0, 0],
            "ar": [0.5],
            "intercept": 10.0,
            "exog_coefficients": [1.0, 0.0, 0.0, 0.0, 0.0],
            "history": {"w": [2.0]},
        }))
        .unwrap();

        let p = model.predict(2, &flat(&model, 2)).unwrap();
        assert_eq!(p.mean, vec![11.0, 10.5]);

        let shocked = DriverVector {
            dollar_return: 2.0,
            ..DriverVector::ZERO
        };
        let p = model.predict(2, &ExogMatrix::flat(&shocked, 2)).unwrap();
        assert_eq!(p.mean, vec![13.0, 12.5]);
    }

    #[test]
    fn integrated_ma1_carries_last_level() {
        let model = load(json!({
            "order": [0, 1, 1],
            "ma": [0.4],
            "history": {"residuals": [1.0], "levels": [5.0]},
        }))
        .unwrap();

        let p = model.predict(3, &flat(&model, 3)).unwrap();
        assert!((p.mean[0] - 5.4).abs() < 1e-12);
        assert!((p.mean[1] - 5.4).abs() < 1e-12);
        assert!((p.mean[2] - 5.4).abs() < 1e-12);

        // psi = [1, 1.4, 1.4]
        let se = p.std_err.unwrap();
        assert!((se[0] - 1.0).abs() < 1e-12);
        assert!((se[1] - (1.0f64 + 1.96).sqrt()).abs() < 1e-12);
        assert!((se[2] - (1.0f64 + 1.96 + 1.96).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn seasonal_ar_reads_one_period_back() {
        let model = load(json!({
            "seasonal_order": [1, 0, 0, 4],
            "seasonal_ar": [0.5],
            "history": {"w": [1.0, 2.0, 3.0, 4.0]},
        }))
        .unwrap();

        let p = model.predict(5, &flat(&model, 5)).unwrap();
        assert_eq!(p.mean, vec![0.5, 1.0, 1.5, 2.0, 0.25]);
    }

    #[test]
    fn second_order_differencing_extrapolates_trend() {
        let model = load(json!({
            "order": [0, 2, 0],
            "history": {"levels": [1.0, 2.0]},
        }))
        .unwrap();

        let p = model.predict(3, &flat(&model, 3)).unwrap();
        assert_eq!(p.mean, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn rejects_wrong_exog_width_and_horizon() {
        let model = load(json!({"max_horizon": 10})).unwrap();

        let narrow = ExogMatrix::new(4, vec![0.0; 8]).unwrap();
        assert_eq!(
            model.predict(2, &narrow).unwrap_err(),
            ModelError::ExogShape {
                expected: 5,
                got: 4
            }
        );
        assert_eq!(
            model.predict(11, &flat(&model, 11)).unwrap_err(),
            ModelError::UnsupportedHorizon {
                horizon: 11,
                max: 10
            }
        );
        assert!(matches!(
            model.predict(3, &flat(&model, 2)).unwrap_err(),
            ModelError::ExogRows { horizon: 3, got: 2 }
        ));
    }

    #[test]
    fn rejects_short_history() {
        let err = load(json!({
            "order": [2, 0, 0],
            "ar": [0.3, 0.2],
            "history": {"w": [1.0]},
        }))
        .unwrap_err();
        assert!(err.to_string().contains("history.w"));
    }

    #[test]
    fn rejects_mismatched_orders_and_exog_names() {
        assert!(load(json!({"order": [1, 0, 0], "ar": []})).is_err());
        assert!(load(json!({
            "exog_names": ["dollar_return", "indpro_return", "inventory_pct", "fed_funds_diff", "brent_return"]
        }))
        .is_err());
        assert!(load(json!({"last_exog": {"dollar_return": 0.0}})).is_err());
    }

    #[test]
    fn reads_last_observations() {
        let model = load(json!({
            "last_exog": {
                "dollar_return": 0.001,
                "indpro_return": 0.002,
                "inventory_pct": -0.01,
                "fed_funds_diff": 0.0,
                "vix_diff": 0.5
            },
            "last_observed": "2025-06-27",
        }))
        .unwrap();
        assert_eq!(model.last_exog().to_array(), [0.001, 0.002, -0.01, 0.0, 0.5]);
        assert_eq!(model.last_price(), 80.0);
        assert_eq!(
            model.last_observed(),
            NaiveDate::from_ymd_opt(2025, 6, 27)
        );
    }

    #[test]
    fn shipped_demo_artifact_runs_end_to_end() {
        let model = SarimaxModel::from_json(include_str!("../../../../models/brent_demo.json")).unwrap();
        let result = crate::engine::Simulator::default()
            .run_direct(Some(&model), "opec_cut", 1.0, 12)
            .unwrap();

        // Flat exog path: the shock moves every week by β·shock = 2.25.
        for (b, s) in result
            .baseline_trajectory
            .values()
            .zip(result.counterfactual_trajectory.values())
        {
            assert!((s - b - 2.25).abs() < 1e-9);
        }
        let bands = result.baseline_trajectory.interval.as_ref().unwrap();
        assert!(bands[11].upper - bands[11].lower > bands[0].upper - bands[0].lower);
        assert_eq!(result.last_observed, NaiveDate::from_ymd_opt(2026, 2, 27));
    }
}
