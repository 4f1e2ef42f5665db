//! Training configuration.
//!
//! A [`TrainingConfig`] can be built in code or parsed from JSON:
//!
//! ```json
//! {
//!   "learning_rate": 0.01,
//!   "max_iterations": 100,
//!   "derivative": "activation",
//!   "restore_best": false,
//!   "loss_log": "error.txt"
//! }
//! ```
//!
//! Every field except `learning_rate` and `max_iterations` is optional.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How the backward pass evaluates `g'` for each neuron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeMode {
    /// The layer's own activation derivative at the pre-activation sum.
    #[default]
    Activation,
    /// `o * (1 - o)` from the neuron output, whatever the activation. Matches
    /// the historical trainer and is exact only for sigmoid layers.
    SigmoidOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    #[serde(default)]
    pub derivative: DerivativeMode,
    /// Put back the weights with the lowest validation loss when training stops.
    #[serde(default)]
    pub restore_best: bool,
    /// File receiving one validation loss per line.
    #[serde(default)]
    pub loss_log: Option<PathBuf>,
}

impl TrainingConfig {
    pub fn new(learning_rate: f64, max_iterations: usize) -> Self {
        Self {
            learning_rate,
            max_iterations,
            derivative: DerivativeMode::default(),
            restore_best: false,
            loss_log: None,
        }
    }

    pub fn with_derivative(mut self, derivative: DerivativeMode) -> Self {
        self.derivative = derivative;
        self
    }

    pub fn with_restore_best(mut self, restore_best: bool) -> Self {
        self.restore_best = restore_best;
        self
    }

    pub fn with_loss_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.loss_log = Some(path.into());
        self
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: TrainingConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::invalid(
                "training config",
                format!("learning rate must be positive, got {}", self.learning_rate),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid("training config", "max_iterations must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default() {
        let cfg: TrainingConfig =
            serde_json::from_str(r#"{"learning_rate": 0.1, "max_iterations": 5}"#).unwrap();
        assert_eq!(cfg, TrainingConfig::new(0.1, 5));
        assert_eq!(cfg.derivative, DerivativeMode::Activation);
    }

    #[test]
    fn parses_every_field() {
        let cfg: TrainingConfig = serde_json::from_str(
            r#"{"learning_rate": 0.01, "max_iterations": 100,
                "derivative": "sigmoid_output", "restore_best": true,
                "loss_log": "error.txt"}"#,
        )
        .unwrap();
        assert_eq!(cfg.derivative, DerivativeMode::SigmoidOutput);
        assert!(cfg.restore_best);
        assert_eq!(cfg.loss_log, Some(PathBuf::from("error.txt")));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(TrainingConfig::new(0.0, 10).validate().unwrap_err().is_invalid_input());
        assert!(TrainingConfig::new(-0.5, 10).validate().is_err());
        assert!(TrainingConfig::new(f64::NAN, 10).validate().is_err());
        assert!(TrainingConfig::new(0.1, 0).validate().is_err());
        assert!(TrainingConfig::new(0.1, 1).validate().is_ok());
    }
}
