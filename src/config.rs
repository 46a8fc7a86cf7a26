//! Analysis configuration
//!
//! Defaults: seed 42, alpha 0.05, 80/20 split, 32/16 hidden units,
//! 10 epochs, batch size 32.
//! A TOML file may override any subset of them:
//!
//! ```toml
//! [ab_test]
//! seed = 7
//! significance_level = 0.01
//!
//! [predictor]
//! epochs = 25
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Exploratory summary settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaConfig {
    /// Number of equal-width CTR histogram bins
    pub histogram_bins: usize,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self { histogram_bins: 20 }
    }
}

/// A/B significance test settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbTestConfig {
    /// Seed for the variant assignment generator
    pub seed: u64,

    /// Reject equal CTR when p-value < significance_level
    pub significance_level: f64,
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            significance_level: 0.05,
        }
    }
}

/// Click predictor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Run the predictor stage at all
    pub enabled: bool,
    /// Seed for the train/test split, weight initialization and batch shuffling
    pub seed: u64,
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Fraction of the training subset held out for validation during training
    pub validation_fraction: f64,
    /// Hidden layer widths, in order
    pub hidden_units: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Probability threshold for a positive (clicked) prediction
    pub decision_threshold: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 42,
            test_fraction: 0.2,
            validation_fraction: 0.2,
            hidden_units: vec![32, 16],
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.001,
            decision_threshold: 0.5,
        }
    }
}

/// Root configuration for an analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub eda: EdaConfig,
    pub ab_test: AbTestConfig,
    pub predictor: PredictorConfig,
}

impl AnalysisConfig {
    /// Load configuration from a TOML file, missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eda.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "eda.histogram_bins must be >= 1".to_string(),
            ));
        }

        let alpha = self.ab_test.significance_level;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ab_test.significance_level must be in (0, 1), got {}",
                alpha
            )));
        }

        let p = &self.predictor;
        if !(p.test_fraction > 0.0 && p.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "predictor.test_fraction must be in (0, 1), got {}",
                p.test_fraction
            )));
        }
        if !(p.validation_fraction >= 0.0 && p.validation_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "predictor.validation_fraction must be in [0, 1), got {}",
                p.validation_fraction
            )));
        }
        if p.hidden_units.iter().any(|&units| units == 0) {
            return Err(ConfigError::Invalid(
                "predictor.hidden_units must all be >= 1".to_string(),
            ));
        }
        if p.epochs == 0 {
            return Err(ConfigError::Invalid("predictor.epochs must be >= 1".to_string()));
        }
        if p.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "predictor.batch_size must be >= 1".to_string(),
            ));
        }
        if !(p.learning_rate > 0.0 && p.learning_rate.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "predictor.learning_rate must be positive, got {}",
                p.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&p.decision_threshold) {
            return Err(ConfigError::Invalid(format!(
                "predictor.decision_threshold must be in [0, 1], got {}",
                p.decision_threshold
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.ab_test.seed, 42);
        assert_eq!(config.ab_test.significance_level, 0.05);
        assert!(config.predictor.enabled);
        assert_eq!(config.predictor.test_fraction, 0.2);
        assert_eq!(config.predictor.validation_fraction, 0.2);
        assert_eq!(config.predictor.hidden_units, vec![32, 16]);
        assert_eq!(config.predictor.epochs, 10);
        assert_eq!(config.predictor.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            [ab_test]
            significance_level = 0.01

            [predictor]
            epochs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.ab_test.significance_level, 0.01);
        assert_eq!(config.ab_test.seed, 42);
        assert_eq!(config.predictor.epochs, 3);
        assert_eq!(config.predictor.batch_size, 32);
        assert_eq!(config.eda.histogram_bins, 20);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[eda]\nhistogram_bins = 8").unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.eda.histogram_bins, 8);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ab_test]\nsignificance_level = 1.5").unwrap();

        let err = AnalysisConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[predictor]\nepochs = \"ten\"").unwrap();

        let err = AnalysisConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_test_fraction() {
        let mut config = AnalysisConfig::default();
        config.predictor.test_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_hidden_units() {
        let mut config = AnalysisConfig::default();
        config.predictor.hidden_units = vec![32, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_zero_batch_size() {
        let mut config = AnalysisConfig::default();
        config.predictor.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
