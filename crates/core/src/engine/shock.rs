use crate::config::EngineConfig;
use crate::domain::driver::ShockVector;
use crate::domain::scenario::ScenarioDefinition;
use crate::engine::SimulationError;

/// Shock vector together with the modifier that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedShock {
    pub vector: ShockVector,
    pub modifier: f64,
    pub requested_modifier: f64,
}

impl AppliedShock {
    pub fn was_clamped(&self) -> bool {
        self.modifier != self.requested_modifier
    }
}

/// Scales a scenario's base shock by a magnitude modifier.
///
/// Every delta is `base_shock[i] * modifier`, with no interaction between
/// drivers, so the shock stays readable against the model's linear coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShockBuilder {
    min: f64,
    max: f64,
}

impl Default for ShockBuilder {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ShockBuilder {
    pub fn new(min: f64, max: f64) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.magnitude_min, config.magnitude_max)
    }

    /// Out-of-range modifiers are clamped to the nearest bound; non-finite ones
    /// are rejected.
    pub fn build(
        &self,
        scenario: &ScenarioDefinition,
        magnitude_modifier: f64,
    ) -> Result<AppliedShock, SimulationError> {
        if !magnitude_modifier.is_finite() {
            return Err(SimulationError::intent(
                "magnitude_modifier",
                format!("must be finite (got {magnitude_modifier})"),
            ));
        }

        let modifier = magnitude_modifier.clamp(self.min, self.max);
        if modifier != magnitude_modifier {
            tracing::warn!(
                scenario = %scenario.key,
                requested = magnitude_modifier,
                applied = modifier,
                "magnitude modifier clamped to admissible range"
            );
        }

        Ok(AppliedShock {
            vector: scenario.base_shock.scaled(modifier),
            modifier,
            requested_modifier: magnitude_modifier,
        })
    }
}
