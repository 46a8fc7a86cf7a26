//! CLI argument parsing for adlift

use crate::config::AnalysisConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "adlift")]
#[command(version)]
#[command(
    about = "CTR analysis, A/B significance testing and click prediction for ad campaign data",
    long_about = None
)]
pub struct Cli {
    /// Campaign CSV with Age, Gender, Impressions, Clicks and Spend columns
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// TOML configuration file (command-line flags take precedence)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seed for variant assignment, data split and weight initialization
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Significance level for the A/B test
    #[arg(short, long, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// Training epochs for the click predictor
    #[arg(long, value_name = "N")]
    pub epochs: Option<usize>,

    /// Mini-batch size for the click predictor
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<usize>,

    /// Fraction of rows held out for predictor evaluation
    #[arg(long = "test-fraction", value_name = "FRACTION")]
    pub test_fraction: Option<f64>,

    /// Number of CTR histogram bins
    #[arg(long, value_name = "N")]
    pub bins: Option<usize>,

    /// Skip training the click predictor
    #[arg(long = "skip-predictor")]
    pub skip_predictor: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also write a self-contained HTML report to this path
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of `config`
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(seed) = self.seed {
            config.ab_test.seed = seed;
            config.predictor.seed = seed;
        }
        if let Some(alpha) = self.alpha {
            config.ab_test.significance_level = alpha;
        }
        if let Some(epochs) = self.epochs {
            config.predictor.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.predictor.batch_size = batch_size;
        }
        if let Some(test_fraction) = self.test_fraction {
            config.predictor.test_fraction = test_fraction;
        }
        if let Some(bins) = self.bins {
            config.eda.histogram_bins = bins;
        }
        if self.skip_predictor {
            config.predictor.enabled = false;
        }
    }
}
