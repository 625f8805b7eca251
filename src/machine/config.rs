//! Machine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arith::Operation;
use crate::float::{FloatFormat, FormatError};
use crate::relay::DEFAULT_ITERATION_CAP;

/// How tape validation reports errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Report every error found.
    CollectAll,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("iteration cap must be positive")]
    ZeroIterationCap,

    #[error("cycle limit must be positive")]
    ZeroCycleLimit,

    #[error("no unit named `{0}`")]
    UnknownUnit(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relaxation passes allowed per settle.
    pub iteration_cap: usize,
    pub fault_policy: FaultPolicy,
    pub format: FloatFormat,
    /// Machine cycles allowed per run.
    pub cycle_limit: u64,
    /// Unit to wire a self-interrupting relay into.
    pub inject_oscillation: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            iteration_cap: DEFAULT_ITERATION_CAP,
            fault_policy: FaultPolicy::FailFast,
            format: FloatFormat::Z3,
            cycle_limit: 1_000_000,
            inject_oscillation: None,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.format.validate()?;
        if self.iteration_cap == 0 {
            return Err(ConfigError::ZeroIterationCap);
        }
        if self.cycle_limit == 0 {
            return Err(ConfigError::ZeroCycleLimit);
        }
        if let Some(unit) = &self.inject_oscillation {
            if Operation::from_name(unit).is_none() {
                return Err(ConfigError::UnknownUnit(unit.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.iteration_cap, 256);
        assert_eq!(config.format.width(), 22);
        assert_eq!(config.cycle_limit, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(
            r#"{ "iteration_cap": 64, "fault_policy": "collect_all",
                 "format": { "fraction_bits": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.iteration_cap, 64);
        assert_eq!(config.fault_policy, FaultPolicy::CollectAll);
        assert_eq!(config.format, FloatFormat::new(7, 10));
        assert_eq!(config.cycle_limit, 1_000_000);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            Config::from_json(r#"{ "iteration_cap": 0 }"#),
            Err(ConfigError::ZeroIterationCap)
        );
        assert_eq!(
            Config::from_json(r#"{ "format": { "exponent_bits": 12 } }"#),
            Err(ConfigError::Format(FormatError::ExponentWidth(12)))
        );
        assert_eq!(
            Config::from_json(r#"{ "inject_oscillation": "mod" }"#),
            Err(ConfigError::UnknownUnit("mod".to_string()))
        );
        assert!(matches!(
            Config::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
