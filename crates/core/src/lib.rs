pub mod domain;
pub mod engine;
pub mod llm;
pub mod model;
pub mod report;

pub use engine::{list_scenarios, run_simulation, run_simulation_from_intent};

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub model_path: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub max_horizon_weeks: Option<u32>,
        pub magnitude_min: Option<f64>,
        pub magnitude_max: Option<f64>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                model_path: std::env::var("MODEL_PATH").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                max_horizon_weeks: parse_env("SIM_MAX_HORIZON_WEEKS")?,
                magnitude_min: parse_env("SIM_MAGNITUDE_MIN")?,
                magnitude_max: parse_env("SIM_MAGNITUDE_MAX")?,
            })
        }

        pub fn require_model_path(&self) -> anyhow::Result<&str> {
            self.model_path.as_deref().context("MODEL_PATH is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{key} is not valid: {s:?}")),
            _ => Ok(None),
        }
    }

    /// Knobs of the simulation engine.
    #[derive(Debug, Clone, PartialEq)]
    pub struct EngineConfig {
        pub max_horizon_weeks: u32,
        pub magnitude_min: f64,
        pub magnitude_max: f64,
        /// Weeks at which impact is reported.
        pub checkpoints: Vec<u32>,
    }

    impl Default for EngineConfig {
        fn default() -> Self {
            Self {
                max_horizon_weeks: 52,
                magnitude_min: -3.0,
                magnitude_max: 3.0,
                checkpoints: vec![1, 12],
            }
        }
    }

    impl EngineConfig {
        pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
            let mut out = Self::default();
            if let Some(n) = settings.max_horizon_weeks {
                out.max_horizon_weeks = n;
            }
            if let Some(v) = settings.magnitude_min {
                out.magnitude_min = v;
            }
            if let Some(v) = settings.magnitude_max {
                out.magnitude_max = v;
            }

            anyhow::ensure!(
                out.max_horizon_weeks >= 1,
                "SIM_MAX_HORIZON_WEEKS must be >= 1 (got {})",
                out.max_horizon_weeks
            );
            anyhow::ensure!(
                out.magnitude_min.is_finite()
                    && out.magnitude_max.is_finite()
                    && out.magnitude_min <= out.magnitude_max,
                "magnitude range is invalid: [{}, {}]",
                out.magnitude_min,
                out.magnitude_max
            );
            Ok(out)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn empty_settings() -> Settings {
            Settings {
                model_path: None,
                anthropic_api_key: None,
                sentry_dsn: None,
                max_horizon_weeks: None,
                magnitude_min: None,
                magnitude_max: None,
            }
        }

        #[test]
        fn engine_config_defaults_without_overrides() {
            let cfg = EngineConfig::from_settings(&empty_settings()).unwrap();
            assert_eq!(cfg, EngineConfig::default());
            assert_eq!(cfg.checkpoints, vec![1, 12]);
        }

        #[test]
        fn engine_config_rejects_inverted_range() {
            let settings = Settings {
                magnitude_min: Some(2.0),
                magnitude_max: Some(-2.0),
                ..empty_settings()
            };
            assert!(EngineConfig::from_settings(&settings).is_err());
        }

        #[test]
        fn require_model_path_reports_missing_key() {
            let err = empty_settings().require_model_path().unwrap_err();
            assert!(err.to_string().contains("MODEL_PATH"));
        }
    }
}
