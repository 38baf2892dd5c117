use serde::{Deserialize, Serialize};
use std::fmt;

/// Exogenous macro drivers, in the column order the model was fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    DollarReturn,
    IndproReturn,
    InventoryPct,
    FedFundsDiff,
    VixDiff,
}

impl Driver {
    pub const COUNT: usize = 5;

    pub const ALL: [Driver; Driver::COUNT] = [
        Driver::DollarReturn,
        Driver::IndproReturn,
        Driver::InventoryPct,
        Driver::FedFundsDiff,
        Driver::VixDiff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Driver::DollarReturn => "dollar_return",
            Driver::IndproReturn => "indpro_return",
            Driver::InventoryPct => "inventory_pct",
            Driver::FedFundsDiff => "fed_funds_diff",
            Driver::VixDiff => "vix_diff",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per driver. Serves as base shock, shock vector and exogenous row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverVector {
    pub dollar_return: f64,
    pub indpro_return: f64,
    pub inventory_pct: f64,
    pub fed_funds_diff: f64,
    pub vix_diff: f64,
}

/// Per-driver deltas applied on top of the last observed exogenous values.
pub type ShockVector = DriverVector;

impl DriverVector {
    pub const ZERO: DriverVector = DriverVector {
        dollar_return: 0.0,
        indpro_return: 0.0,
        inventory_pct: 0.0,
        fed_funds_diff: 0.0,
        vix_diff: 0.0,
    };

    pub fn from_array(values: [f64; Driver::COUNT]) -> Self {
        let [dollar_return, indpro_return, inventory_pct, fed_funds_diff, vix_diff] = values;
        Self {
            dollar_return,
            indpro_return,
            inventory_pct,
            fed_funds_diff,
            vix_diff,
        }
    }

    pub fn to_array(&self) -> [f64; Driver::COUNT] {
        [
            self.dollar_return,
            self.indpro_return,
            self.inventory_pct,
            self.fed_funds_diff,
            self.vix_diff,
        ]
    }

    pub fn get(&self, driver: Driver) -> f64 {
        match driver {
            Driver::DollarReturn => self.dollar_return,
            Driver::IndproReturn => self.indpro_return,
            Driver::InventoryPct => self.inventory_pct,
            Driver::FedFundsDiff => self.fed_funds_diff,
            Driver::VixDiff => self.vix_diff,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_array(self.to_array().map(|v| v * factor))
    }

    pub fn plus(&self, other: &DriverVector) -> Self {
        let a = self.to_array();
        let b = other.to_array();
        Self::from_array(std::array::from_fn(|i| a[i] + b[i]))
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Non-zero entries, in driver order. Used for logs and reports.
    pub fn nonzero(&self) -> Vec<(Driver, f64)> {
        Driver::ALL
            .into_iter()
            .map(|d| (d, self.get(d)))
            .filter(|(_, v)| *v != 0.0)
            .collect()
    }
}
