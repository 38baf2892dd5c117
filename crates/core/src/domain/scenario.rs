use crate::domain::driver::DriverVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub base_shock: DriverVector,
}

/// Enumeration view of a scenario, as served to API/UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub key: String,
    /// Served as `name` on the wire.
    #[serde(rename = "name")]
    pub display_name: String,
    pub description: String,
}

impl From<&ScenarioDefinition> for ScenarioSummary {
    fn from(def: &ScenarioDefinition) -> Self {
        Self {
            key: def.key.clone(),
            display_name: def.display_name.clone(),
            description: def.description.clone(),
        }
    }
}
