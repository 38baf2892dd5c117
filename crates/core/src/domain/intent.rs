use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How sure the intent parser was about its scenario match.
///
/// Display-only metadata: it is carried through to the result for narration and
/// never scales the shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(format!("expected low|medium|high, got {other:?}")),
        }
    }
}

/// A validated intent descriptor. Built from LLM output by
/// [`crate::domain::contract::IntentDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub scenario_key: String,
    pub magnitude_modifier: f64,
    pub confidence: Confidence,
    pub reasoning: String,

    /// The user's own framing of the question, restated by the parser.
    pub scenario_context: Option<String>,
    /// Country, organisation or event the user named, if any.
    pub specific_entity: Option<String>,
    /// Horizon the user asked for, if they asked for one.
    pub forecast_weeks: Option<u32>,
}

impl ParsedIntent {
    /// Intent for a direct run (no language parsing involved).
    pub fn direct(scenario_key: impl Into<String>, magnitude_modifier: f64) -> Self {
        Self {
            scenario_key: scenario_key.into(),
            magnitude_modifier,
            confidence: Confidence::High,
            reasoning: "direct run".to_string(),
            scenario_context: None,
            specific_entity: None,
            forecast_weeks: None,
        }
    }
}
