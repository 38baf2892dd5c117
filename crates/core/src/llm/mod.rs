pub mod anthropic;
pub mod error;
pub mod json;

use crate::domain::intent::ParsedIntent;
use crate::domain::simulation::SimulationResult;
use serde::Serialize;

pub const FALLBACK_UNCERTAINTY: &str = "Model assumes historical relationships remain stable. \
Structural breaks may cause actual outcomes to differ significantly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provider {
    Anthropic,
}

/// Language-model collaborator: parses questions into intent descriptors and
/// narrates simulation results. Never runs forecasts itself.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Raw intent descriptor for a free-text question.
    async fn parse_intent(&self, query: &str) -> anyhow::Result<serde_json::Value>;

    async fn explain_results(
        &self,
        result: &SimulationResult,
        intent: &ParsedIntent,
    ) -> anyhow::Result<String>;

    async fn uncertainty_note(&self, result: &SimulationResult) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narration {
    pub explanation: String,
    pub uncertainty_note: String,
}

/// Ask for both narration pieces, degrading to fixed text when a call fails.
pub async fn narrate(
    client: &dyn LlmClient,
    result: &SimulationResult,
    intent: &ParsedIntent,
) -> Narration {
    let explanation = match client.explain_results(result, intent).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, scenario = result.scenario_key(), "explanation failed");
            format!("Explanation unavailable: {e}")
        }
    };
    let uncertainty_note = match client.uncertainty_note(result).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, scenario = result.scenario_key(), "uncertainty note failed");
            FALLBACK_UNCERTAINTY.to_string()
        }
    };
    Narration {
        explanation,
        uncertainty_note,
    }
}
