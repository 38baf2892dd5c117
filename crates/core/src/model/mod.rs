pub mod sarimax;

use crate::domain::driver::{Driver, DriverVector};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("exogenous matrix has {got} columns, model expects {expected}")]
    ExogShape { expected: usize, got: usize },

    #[error("exogenous matrix has {got} rows for a horizon of {horizon}")]
    ExogRows { horizon: usize, got: usize },

    #[error("horizon {horizon} outside the model's supported range 1..={max}")]
    UnsupportedHorizon { horizon: usize, max: usize },

    #[error("numerical failure: {detail}")]
    Numerical { detail: String },

    #[error("invalid model artifact: {detail}")]
    InvalidArtifact { detail: String },
}

/// Row-major matrix of future exogenous values, one row per forecast week.
#[derive(Debug, Clone, PartialEq)]
pub struct ExogMatrix {
    width: usize,
    data: Vec<f64>,
}

impl ExogMatrix {
    pub fn new(width: usize, data: Vec<f64>) -> Result<Self, ModelError> {
        if width == 0 || data.len() % width != 0 {
            return Err(ModelError::ExogShape {
                expected: width,
                got: data.len(),
            });
        }
        Ok(Self { width, data })
    }

    /// The same driver row repeated for every week of the horizon.
    pub fn flat(row: &DriverVector, horizon: usize) -> Self {
        let row = row.to_array();
        let mut data = Vec::with_capacity(row.len() * horizon);
        for _ in 0..horizon {
            data.extend_from_slice(&row);
        }
        Self {
            width: Driver::COUNT,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.width
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.width..(i + 1) * self.width]
    }
}

/// Output of one call to the prediction primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub mean: Vec<f64>,
    /// Forecast standard errors, when the model produces them.
    pub std_err: Option<Vec<f64>>,
}

/// A fitted forecasting model, borrowed read-only for each simulation.
///
/// Implementations must be safe to call concurrently through `&self`.
pub trait FittedModel: Send + Sync {
    fn name(&self) -> &str;

    /// False while the model is still loading or after it was invalidated.
    fn is_ready(&self) -> bool {
        true
    }

    /// Last observed value of every exogenous driver in the training history.
    fn last_exog(&self) -> DriverVector;

    fn last_price(&self) -> f64;

    fn last_observed(&self) -> Option<NaiveDate> {
        None
    }

    /// Forecast `horizon` steps past the end of the training history.
    fn predict(&self, horizon: usize, exog: &ExogMatrix) -> Result<Prediction, ModelError>;
}
