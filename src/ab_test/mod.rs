// Simulated A/B significance testing over campaign CTR
//
// Records are split into two synthetic variants by a seeded uniform draw,
// impressions and clicks are summed per variant, and the CTR difference is
// checked with a two-proportion z-test at a fixed significance level.
//
// Degenerate inputs are typed errors rather than NaN:
// - a variant with zero impressions (undefined group CTR)
// - pooled proportion of exactly 0 or 1 (zero pooled variance, z undefined)
// - summed impressions or clicks beyond u64

mod assignment;
mod statistics;
mod verdict;

pub use assignment::{aggregate_groups, assign_variants, GroupAggregate};
pub use statistics::{two_proportion_z_test, ZTest};
pub use verdict::{evaluate_groups, run_ab_test, AbTestResult};

use crate::dataset::Variant;
use thiserror::Error;

/// Errors for A/B significance testing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AbTestError {
    #[error("Row {row} has no variant assigned")]
    MissingVariant { row: usize },

    #[error("Variant {variant} has zero impressions, its CTR is undefined")]
    EmptyGroup { variant: Variant },

    #[error("Invalid counts: {clicks} clicks out of {impressions} impressions")]
    InvalidCounts { clicks: u64, impressions: u64 },

    #[error("Pooled CTR is {pooled}, the pooled variance is zero and z is undefined")]
    ZeroPooledVariance { pooled: f64 },

    #[error("Significance level must be in (0, 1), got {0}")]
    InvalidSignificanceLevel(f64),

    #[error("Summed impressions or clicks overflow a 64-bit counter")]
    CountOverflow,

    #[error("Failed to build the standard normal distribution: {0}")]
    Distribution(String),
}

pub type Result<T> = std::result::Result<T, AbTestError>;
