// A/B verdict: assignment, aggregation and the decision rule
//
// Significant iff p-value < significance_level. The result carries the
// z-statistic and p-value behind the decision together with the lift of B
// over A and its 95% confidence interval (unpooled standard error).

use crate::ab_test::assignment::{aggregate_groups, assign_variants, GroupAggregate};
use crate::ab_test::statistics::{two_proportion_z_test, ZTest};
use crate::ab_test::{AbTestError, Result};
use crate::config::AbTestConfig;
use crate::dataset::CampaignTable;
use serde::{Deserialize, Serialize};

/// Two-sided 95% standard normal quantile
const Z_95: f64 = 1.959_963_984_540_054;

/// Outcome of the simulated A/B test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestResult {
    /// Aggregates in `[A, B]` order
    pub groups: [GroupAggregate; 2],

    /// z-test of CTR(A) against CTR(B)
    pub test: ZTest,

    /// Significance level (alpha) the decision was made at
    pub significance_level: f64,

    /// True when the null hypothesis of equal CTR is rejected
    pub significant: bool,

    pub ctr_a: f64,
    pub ctr_b: f64,

    /// CTR(B) - CTR(A)
    pub absolute_lift: f64,

    /// (CTR(B) - CTR(A)) / CTR(A), undefined when CTR(A) is zero
    pub relative_lift: Option<f64>,

    /// 95% confidence interval of CTR(B) - CTR(A)
    pub confidence_interval: (f64, f64),
}

impl AbTestResult {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        if self.significant {
            report.push_str("✅ SIGNIFICANT CTR DIFFERENCE\n\n");
        } else {
            report.push_str("➖ NO SIGNIFICANT CTR DIFFERENCE\n\n");
        }

        for group in &self.groups {
            report.push_str(&format!(
                "  Variant {}: rows={} impressions={} clicks={} CTR={:.6}\n",
                group.variant,
                group.rows,
                group.impressions,
                group.clicks,
                group.ctr().unwrap_or(0.0)
            ));
        }

        report.push_str(&format!("\nZ-statistic: {:.4}\n", self.test.statistic));
        report.push_str(&format!("P-value: {:.6}\n", self.test.pvalue));
        report.push_str(&format!(
            "Significance level: {} ({}% confidence)\n",
            self.significance_level,
            (1.0 - self.significance_level) * 100.0
        ));
        report.push_str(&format!("Significant: {}\n", self.significant));
        report.push_str(&format!(
            "Lift (B - A): {:+.6} [95% CI {:+.6}, {:+.6}]\n",
            self.absolute_lift, self.confidence_interval.0, self.confidence_interval.1
        ));
        if let Some(relative) = self.relative_lift {
            report.push_str(&format!("Relative lift: {:+.2}%\n", relative * 100.0));
        }

        report
    }
}

/// Assign variants to the table, aggregate them and run the z-test
///
/// The variant column is written back into `table` so later stages can use
/// it as a feature.
pub fn run_ab_test(table: &mut CampaignTable, config: &AbTestConfig) -> Result<AbTestResult> {
    validate_significance_level(config.significance_level)?;

    assign_variants(table, config.seed);
    let groups = aggregate_groups(table)?;
    let result = evaluate_groups(groups, config.significance_level)?;

    tracing::info!(
        "A/B test: z={:.4} p={:.6} significant={}",
        result.test.statistic,
        result.test.pvalue,
        result.significant
    );

    Ok(result)
}

/// Apply the decision rule to already aggregated groups
pub fn evaluate_groups(
    groups: [GroupAggregate; 2],
    significance_level: f64,
) -> Result<AbTestResult> {
    validate_significance_level(significance_level)?;

    for group in &groups {
        if group.impressions == 0 {
            return Err(AbTestError::EmptyGroup {
                variant: group.variant,
            });
        }
    }

    let [a, b] = &groups;
    let test = two_proportion_z_test(a.clicks, a.impressions, b.clicks, b.impressions)?;

    let n_a = a.impressions as f64;
    let n_b = b.impressions as f64;
    let ctr_a = a.clicks as f64 / n_a;
    let ctr_b = b.clicks as f64 / n_b;
    let absolute_lift = ctr_b - ctr_a;
    let relative_lift = (ctr_a > 0.0).then(|| absolute_lift / ctr_a);

    let unpooled_se = (ctr_a * (1.0 - ctr_a) / n_a + ctr_b * (1.0 - ctr_b) / n_b).sqrt();
    let margin = Z_95 * unpooled_se;

    Ok(AbTestResult {
        significant: test.pvalue < significance_level,
        test,
        significance_level,
        ctr_a,
        ctr_b,
        absolute_lift,
        relative_lift,
        confidence_interval: (absolute_lift - margin, absolute_lift + margin),
        groups,
    })
}

fn validate_significance_level(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(AbTestError::InvalidSignificanceLevel(alpha))
    }
}
