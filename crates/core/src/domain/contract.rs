use crate::domain::intent::{Confidence, ParsedIntent};
use crate::engine::SimulationError;
use serde_json::{Map, Value};

/// Intent descriptor as emitted by the LLM collaborator.
///
/// Field-by-field validation is done on the raw JSON value so a rejection can
/// name the offending field. Nothing here guesses a default for a missing
/// required field.
#[derive(Debug, Clone)]
pub struct IntentDescriptor {
    pub scenario_key: String,
    pub magnitude_modifier: f64,
    pub confidence: String,
    pub reasoning: String,
    pub scenario_context: Option<String>,
    pub specific_entity: Option<String>,
    pub forecast_weeks: Option<u32>,
}

impl IntentDescriptor {
    pub fn from_value(value: &Value) -> Result<Self, SimulationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SimulationError::intent("<root>", "descriptor must be a JSON object"))?;

        let scenario_key = required_str(obj, "scenario_key")?;
        let magnitude_modifier = match obj.get("magnitude_modifier") {
            None | Some(Value::Null) => {
                return Err(SimulationError::intent("magnitude_modifier", "missing"))
            }
            Some(v) => v.as_f64().ok_or_else(|| {
                SimulationError::intent("magnitude_modifier", format!("expected number, got {v}"))
            })?,
        };
        let confidence = required_str(obj, "confidence")?;
        let reasoning = required_str(obj, "reasoning")?;

        let scenario_context = optional_str(obj, "scenario_context")?;
        let specific_entity = optional_str(obj, "specific_entity")?;
        let forecast_weeks = match obj.get("forecast_weeks") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let n = v.as_u64().ok_or_else(|| {
                    SimulationError::intent(
                        "forecast_weeks",
                        format!("expected non-negative integer, got {v}"),
                    )
                })?;
                Some(u32::try_from(n).map_err(|_| {
                    SimulationError::intent("forecast_weeks", format!("out of range: {n}"))
                })?)
            }
        };

        Ok(Self {
            scenario_key,
            magnitude_modifier,
            confidence,
            reasoning,
            scenario_context,
            specific_entity,
            forecast_weeks,
        })
    }

    /// Identifiers are taken verbatim: a padded or mis-cased `scenario_key` or
    /// `confidence` is rejected rather than repaired. Free-text fields are trimmed.
    pub fn validate_and_into_intent(self) -> Result<ParsedIntent, SimulationError> {
        let scenario_key = self.scenario_key;
        if scenario_key.is_empty() {
            return Err(SimulationError::intent("scenario_key", "must be non-empty"));
        }

        if !self.magnitude_modifier.is_finite() {
            return Err(SimulationError::intent(
                "magnitude_modifier",
                format!("must be finite (got {})", self.magnitude_modifier),
            ));
        }

        let confidence = self
            .confidence
            .parse::<Confidence>()
            .map_err(|e| SimulationError::intent("confidence", e))?;

        let scenario_context = self
            .scenario_context
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let specific_entity = self
            .specific_entity
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ParsedIntent {
            scenario_key,
            magnitude_modifier: self.magnitude_modifier,
            confidence,
            reasoning: self.reasoning.trim().to_string(),
            scenario_context,
            specific_entity,
            forecast_weeks: self.forecast_weeks,
        })
    }
}

/// Validate a raw descriptor value into a [`ParsedIntent`].
pub fn parse_intent_value(value: &Value) -> Result<ParsedIntent, SimulationError> {
    IntentDescriptor::from_value(value)?.validate_and_into_intent()
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, SimulationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(SimulationError::intent(field, "missing")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SimulationError::intent(
            field,
            format!("expected string, got {other}"),
        )),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, SimulationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SimulationError::intent(
            field,
            format!("expected string or null, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(err: SimulationError) -> &'static str {
        match err {
            SimulationError::IntentValidation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_minimal_descriptor() {
        let v = json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": 1.5,
            "confidence": "high",
            "reasoning": "supply reduction",
        });
        let intent = parse_intent_value(&v).unwrap();
        assert_eq!(intent.scenario_key, "opec_cut");
        assert_eq!(intent.magnitude_modifier, 1.5);
        assert_eq!(intent.confidence, Confidence::High);
        assert_eq!(intent.forecast_weeks, None);
    }

    #[test]
    fn accepts_optional_extras_and_blank_context() {
        let v = json!({
            "scenario_key": "demand_boom",
            "magnitude_modifier": 2,
            "confidence": "medium",
            "reasoning": "China reopening",
            "scenario_context": "   ",
            "specific_entity": "China",
            "forecast_weeks": 8,
        });
        let intent = parse_intent_value(&v).unwrap();
        assert_eq!(intent.scenario_key, "demand_boom");
        assert_eq!(intent.magnitude_modifier, 2.0);
        assert_eq!(intent.scenario_context, None);
        assert_eq!(intent.specific_entity.as_deref(), Some("China"));
        assert_eq!(intent.forecast_weeks, Some(8));
    }

    #[test]
    fn rejects_missing_scenario_key() {
        let v = json!({
            "magnitude_modifier": 1.0,
            "confidence": "low",
            "reasoning": "",
        });
        assert_eq!(field_of(parse_intent_value(&v).unwrap_err()), "scenario_key");
    }

    #[test]
    fn rejects_mistyped_modifier() {
        let v = json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": "big",
            "confidence": "low",
            "reasoning": "",
        });
        assert_eq!(
            field_of(parse_intent_value(&v).unwrap_err()),
            "magnitude_modifier"
        );
    }

    #[test]
    fn rejects_unknown_confidence_level() {
        let v = json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": 1.0,
            "confidence": "certain",
            "reasoning": "",
        });
        assert_eq!(field_of(parse_intent_value(&v).unwrap_err()), "confidence");
    }

    #[test]
    fn identifiers_are_not_repaired() {
        let v = json!({
            "scenario_key": " opec_cut ",
            "magnitude_modifier": 1.0,
            "confidence": "high",
            "reasoning": "",
        });
        assert_eq!(parse_intent_value(&v).unwrap().scenario_key, " opec_cut ");

        let v = json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": 1.0,
            "confidence": " HIGH ",
            "reasoning": "",
        });
        assert_eq!(field_of(parse_intent_value(&v).unwrap_err()), "confidence");
    }

    #[test]
    fn rejects_non_object_and_negative_weeks() {
        assert_eq!(field_of(parse_intent_value(&json!([1, 2])).unwrap_err()), "<root>");

        let v = json!({
            "scenario_key": "opec_cut",
            "magnitude_modifier": 1.0,
            "confidence": "low",
            "reasoning": "",
            "forecast_weeks": -3,
        });
        assert_eq!(field_of(parse_intent_value(&v).unwrap_err()), "forecast_weeks");
    }
}
