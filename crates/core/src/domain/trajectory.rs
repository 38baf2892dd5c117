use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub week: u32,
    pub value: f64,
}

/// 95% prediction interval for one forecast week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub week: u32,
    pub lower: f64,
    pub upper: f64,
}

/// Weekly forecast path, weeks numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<ForecastPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Vec<PredictionInterval>>,
}

impl Trajectory {
    pub fn from_values(values: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, value)| ForecastPoint {
                week: i as u32 + 1,
                value: *value,
            })
            .collect();
        Self {
            points,
            interval: None,
        }
    }

    pub fn with_interval(mut self, lower: &[f64], upper: &[f64]) -> Self {
        let interval = lower
            .iter()
            .zip(upper)
            .enumerate()
            .map(|(i, (lo, hi))| PredictionInterval {
                week: i as u32 + 1,
                lower: *lo,
                upper: *hi,
            })
            .collect();
        self.interval = Some(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at a 1-based week, if the trajectory reaches it.
    pub fn value_at(&self, week: u32) -> Option<f64> {
        let idx = usize::try_from(week).ok()?.checked_sub(1)?;
        self.points.get(idx).map(|p| p.value)
    }

    pub fn last(&self) -> Option<ForecastPoint> {
        self.points.last().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.values().sum::<f64>() / self.points.len() as f64)
    }
}
