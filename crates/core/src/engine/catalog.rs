use crate::domain::driver::DriverVector;
use crate::domain::scenario::{ScenarioDefinition, ScenarioSummary};
use crate::engine::SimulationError;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

/// Read-only registry of scenarios, kept in declaration order.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    entries: Vec<ScenarioDefinition>,
}

impl ScenarioCatalog {
    pub fn new(entries: Vec<ScenarioDefinition>) -> anyhow::Result<Self> {
        let mut seen = BTreeSet::new();
        for def in &entries {
            anyhow::ensure!(!def.key.trim().is_empty(), "scenario key must be non-empty");
            anyhow::ensure!(
                seen.insert(def.key.as_str()),
                "duplicate scenario key: {}",
                def.key
            );
            anyhow::ensure!(
                def.base_shock.is_finite(),
                "scenario {} has a non-finite base shock",
                def.key
            );
        }
        Ok(Self { entries })
    }

    /// The process-wide catalog, built on first use.
    pub fn builtin() -> Arc<ScenarioCatalog> {
        static CATALOG: OnceLock<Arc<ScenarioCatalog>> = OnceLock::new();
        CATALOG
            .get_or_init(|| Arc::new(Self { entries: builtin_entries() }))
            .clone()
    }

    pub fn lookup(&self, key: &str) -> Result<&ScenarioDefinition, SimulationError> {
        self.entries
            .iter()
            .find(|def| def.key == key)
            .ok_or_else(|| SimulationError::UnknownScenario {
                key: key.to_string(),
                available: self.keys(),
            })
    }

    pub fn list_all(&self) -> &[ScenarioDefinition] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|def| def.key.clone()).collect()
    }

    pub fn summaries(&self) -> Vec<ScenarioSummary> {
        self.entries.iter().map(ScenarioSummary::from).collect()
    }
}

// Shock magnitudes are calibrated against historical episodes of the same kind.
// Units follow the model inputs: weekly returns/percentages as fractions,
// fed funds in percentage points, VIX in index points.
fn builtin_entries() -> Vec<ScenarioDefinition> {
    vec![
        scenario(
            "opec_cut",
            "OPEC Production Cut (10%)",
            "OPEC announces a coordinated 10% production cut. Supply tightens, \
             inventories draw down, risk sentiment improves.",
            DriverVector {
                dollar_return: -0.002,
                indpro_return: 0.0,
                inventory_pct: -0.05,
                fed_funds_diff: 0.0,
                vix_diff: -2.0,
            },
        ),
        scenario(
            "global_recession",
            "Global Recession",
            "A global recession takes hold. Industrial activity contracts sharply, \
             demand for oil collapses, financial markets enter panic mode.",
            DriverVector {
                dollar_return: 0.005,
                indpro_return: -0.02,
                inventory_pct: 0.03,
                fed_funds_diff: 0.0,
                vix_diff: 8.0,
            },
        ),
        scenario(
            "rate_hike",
            "Aggressive Fed Rate Hike (+75bps)",
            "The Federal Reserve raises rates aggressively by 75 basis points. \
             Economic growth slows, dollar strengthens, oil demand weakens.",
            DriverVector {
                dollar_return: 0.008,
                indpro_return: -0.005,
                inventory_pct: 0.0,
                fed_funds_diff: 0.75,
                vix_diff: 3.0,
            },
        ),
        scenario(
            "geopolitical_tension",
            "Major Geopolitical Tension (Supply Disruption)",
            "Significant geopolitical conflict disrupts oil supply routes. Markets \
             panic, safe havens rally, supply uncertainty drives prices up.",
            DriverVector {
                dollar_return: 0.003,
                indpro_return: 0.0,
                inventory_pct: -0.08,
                fed_funds_diff: 0.0,
                vix_diff: 12.0,
            },
        ),
        scenario(
            "demand_boom",
            "Global Demand Boom (China Reopening)",
            "A major emerging market (e.g. China) reopens strongly after a period \
             of restriction. Industrial demand surges globally.",
            DriverVector {
                dollar_return: -0.003,
                indpro_return: 0.015,
                inventory_pct: -0.04,
                fed_funds_diff: 0.0,
                vix_diff: -3.0,
            },
        ),
    ]
}

fn scenario(
    key: &str,
    display_name: &str,
    description: &str,
    base_shock: DriverVector,
) -> ScenarioDefinition {
    ScenarioDefinition {
        key: key.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        base_shock,
    }
}
