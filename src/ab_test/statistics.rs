// Two-proportion z-test over click/impression counts
//
// Pooled proportion p = (c_a + c_b) / (n_a + n_b)
// Standard error  SE = sqrt(p (1 - p) (1/n_a + 1/n_b))
// Statistic        z = (c_a/n_a - c_b/n_b) / SE
// Two-sided p-value  = 2 (1 - Phi(|z|)) = 2 sf(|z|)
//
// The tail comes from the survival function so small p-values keep their
// relative precision instead of cancelling in 1 - Phi.

use crate::ab_test::{AbTestError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Result of a two-proportion z-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZTest {
    /// z-statistic, positive when the first proportion is larger
    pub statistic: f64,

    /// Two-sided p-value
    /// - p < 0.05: the proportions differ significantly
    /// - p >= 0.05: the difference is consistent with chance
    pub pvalue: f64,

    /// Pooled proportion under the null hypothesis
    pub pooled_proportion: f64,

    /// Pooled standard error of the difference
    pub standard_error: f64,
}

/// Compare two click-through proportions with a pooled z-test
///
/// # Arguments
/// * `clicks_a`, `impressions_a` - successes and trials of the first group
/// * `clicks_b`, `impressions_b` - successes and trials of the second group
///
/// # Errors
/// * `InvalidCounts` when a group has zero impressions or more clicks than
///   impressions
/// * `ZeroPooledVariance` when every trial or no trial succeeded
/// * `CountOverflow` when the summed clicks do not fit in a `u64`
///
/// # Example
/// ```
/// use adlift::ab_test::two_proportion_z_test;
///
/// let test = two_proportion_z_test(5_000, 50_000, 7_500, 50_000).unwrap();
/// assert!(test.pvalue < 0.05);
/// assert!(test.statistic < 0.0);
/// ```
pub fn two_proportion_z_test(
    clicks_a: u64,
    impressions_a: u64,
    clicks_b: u64,
    impressions_b: u64,
) -> Result<ZTest> {
    for (clicks, impressions) in [(clicks_a, impressions_a), (clicks_b, impressions_b)] {
        if impressions == 0 || clicks > impressions {
            return Err(AbTestError::InvalidCounts {
                clicks,
                impressions,
            });
        }
    }

    let n_a = impressions_a as f64;
    let n_b = impressions_b as f64;
    let p_a = clicks_a as f64 / n_a;
    let p_b = clicks_b as f64 / n_b;

    let total_clicks = clicks_a
        .checked_add(clicks_b)
        .ok_or(AbTestError::CountOverflow)?;
    let pooled = total_clicks as f64 / (n_a + n_b);
    let variance = pooled * (1.0 - pooled) * (1.0 / n_a + 1.0 / n_b);
    if variance <= 0.0 {
        return Err(AbTestError::ZeroPooledVariance { pooled });
    }

    let standard_error = variance.sqrt();
    let statistic = (p_a - p_b) / standard_error;
    let standard_normal =
        Normal::new(0.0, 1.0).map_err(|e| AbTestError::Distribution(e.to_string()))?;
    let pvalue = (2.0 * standard_normal.sf(statistic.abs())).clamp(0.0, 1.0);

    Ok(ZTest {
        statistic,
        pvalue,
        pooled_proportion: pooled,
        standard_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sided_pvalue_matches_normal_tail() {
        // 1250 vs 1150 clicks out of 10_000 gives |z| ~ 2.18
        let test = two_proportion_z_test(1_250, 10_000, 1_150, 10_000).unwrap();
        let z = test.statistic.abs();
        let normal = Normal::new(0.0, 1.0).unwrap();
        assert!((test.pvalue - 2.0 * (1.0 - normal.cdf(z))).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_pvalue_keeps_precision() {
        // z ~ -23.9, 1 - cdf would round to zero
        let test = two_proportion_z_test(5_000, 50_000, 7_500, 50_000).unwrap();
        assert!(test.pvalue > 0.0);
        assert!(test.pvalue < 1e-100);
    }

    #[test]
    fn test_summed_clicks_overflow() {
        assert_eq!(
            two_proportion_z_test(u64::MAX, u64::MAX, 1, 2).unwrap_err(),
            AbTestError::CountOverflow
        );
    }

    #[test]
    fn test_identical_proportions_not_significant() {
        let test = two_proportion_z_test(1_000, 10_000, 1_000, 10_000).unwrap();
        assert_eq!(test.statistic, 0.0);
        assert!((test.pvalue - 1.0).abs() < 1e-6);
        assert!((test.pooled_proportion - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_known_statistic() {
        // p_a = 0.10, p_b = 0.15, n = 50_000 each
        // pooled = 0.125, SE = sqrt(0.125 * 0.875 * 2 / 50_000) ~ 0.0020917
        let test = two_proportion_z_test(5_000, 50_000, 7_500, 50_000).unwrap();
        let expected_se = (0.125_f64 * 0.875 * (2.0 / 50_000.0)).sqrt();
        assert!((test.standard_error - expected_se).abs() < 1e-12);
        assert!((test.statistic - (-0.05 / expected_se)).abs() < 1e-9);
        assert!(test.pvalue < 1e-10);
    }

    #[test]
    fn test_moderate_difference_pvalue() {
        // z ~ 1.96 gives p ~ 0.05
        // p_a = 0.11, p_b = 0.10, n = 10_000 each: pooled = 0.105,
        // SE = sqrt(0.105 * 0.895 * 0.0002) = 0.0043351, z = 2.3068
        let test = two_proportion_z_test(1_100, 10_000, 1_000, 10_000).unwrap();
        assert!((test.statistic - 2.3068).abs() < 1e-3);
        assert!((test.pvalue - 0.02107).abs() < 1e-3);
    }

    #[test]
    fn test_zero_impressions_rejected() {
        assert_eq!(
            two_proportion_z_test(0, 0, 5, 10).unwrap_err(),
            AbTestError::InvalidCounts {
                clicks: 0,
                impressions: 0
            }
        );
    }

    #[test]
    fn test_clicks_exceeding_impressions_rejected() {
        assert!(matches!(
            two_proportion_z_test(5, 10, 11, 10),
            Err(AbTestError::InvalidCounts { clicks: 11, .. })
        ));
    }

    #[test]
    fn test_zero_pooled_variance() {
        assert!(matches!(
            two_proportion_z_test(0, 100, 0, 100),
            Err(AbTestError::ZeroPooledVariance { .. })
        ));
        assert!(matches!(
            two_proportion_z_test(100, 100, 50, 50),
            Err(AbTestError::ZeroPooledVariance { .. })
        ));
    }
}
