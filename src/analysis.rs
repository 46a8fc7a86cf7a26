//! Linear analysis pipeline: EDA → A/B test → click predictor
//!
//! Each stage reads the shared campaign table; the A/B stage writes the
//! variant column back so the predictor can use it as a feature.

use crate::ab_test::{run_ab_test, AbTestResult};
use crate::config::AnalysisConfig;
use crate::dataset::CampaignTable;
use crate::eda::{summarize, EdaSummary};
use crate::predictor::{run_predictor, PredictorReport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Outcome of the A/B stage
///
/// Degenerate groups (no impressions, zero pooled variance) do not abort the
/// run; the reason is kept so it can be reported next to the other stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AbTestOutcome {
    Completed(AbTestResult),
    Skipped { reason: String },
}

impl AbTestOutcome {
    pub fn result(&self) -> Option<&AbTestResult> {
        match self {
            AbTestOutcome::Completed(result) => Some(result),
            AbTestOutcome::Skipped { .. } => None,
        }
    }
}

/// Combined report of every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub eda: EdaSummary,
    pub ab_test: AbTestOutcome,
    /// `None` when the predictor stage is disabled
    pub predictor: Option<PredictorReport>,
}

impl AnalysisReport {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str(&self.eda.to_report_string());
        report.push_str("\n🧪 A/B TEST\n\n");
        match &self.ab_test {
            AbTestOutcome::Completed(result) => report.push_str(&result.to_report_string()),
            AbTestOutcome::Skipped { reason } => {
                report.push_str("⚠️  A/B TEST SKIPPED\n\n");
                report.push_str(&format!("Reason: {}\n", reason));
            }
        }

        if let Some(predictor) = &self.predictor {
            report.push('\n');
            report.push_str(&predictor.to_report_string());
        }

        report
    }
}

/// Run all stages over `table` in order
pub fn run_analysis(table: &mut CampaignTable, config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate().context("Invalid analysis configuration")?;

    tracing::info!("Stage 1/3: exploratory CTR summary");
    let eda = summarize(table, config.eda.histogram_bins);

    tracing::info!("Stage 2/3: A/B significance test");
    let ab_test = match run_ab_test(table, &config.ab_test) {
        Ok(result) => AbTestOutcome::Completed(result),
        Err(e) => {
            tracing::warn!("A/B test skipped: {}", e);
            AbTestOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    };

    let predictor = if config.predictor.enabled {
        tracing::info!("Stage 3/3: click predictor");
        Some(run_predictor(table, &config.predictor).context("Click predictor failed")?)
    } else {
        tracing::info!("Stage 3/3: click predictor disabled");
        None
    };

    Ok(AnalysisReport {
        eda,
        ab_test,
        predictor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CampaignRecord;

    fn table(clicks: impl Fn(usize) -> u64) -> CampaignTable {
        let ages = ["30-34", "35-39", "40-44", "45-49"];
        CampaignTable::from_records(
            (0..200)
                .map(|i| {
                    let gender = if i % 2 == 0 { "M" } else { "F" };
                    CampaignRecord::new(ages[i % 4], gender, 500, clicks(i), 1.5)
                })
                .collect(),
        )
        .unwrap()
    }

    fn fast_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.predictor.epochs = 2;
        config
    }

    #[test]
    fn test_full_pipeline() {
        let mut t = table(|i| (i % 5) as u64);
        let report = run_analysis(&mut t, &fast_config()).unwrap();

        assert_eq!(report.eda.rows, 200);
        assert!(report.ab_test.result().is_some());
        assert!(t.has_variants());

        let predictor = report.predictor.unwrap();
        assert_eq!(predictor.test_rows, 40);
        assert_eq!(predictor.history.epochs.len(), 2);
    }

    #[test]
    fn test_zero_clicks_skips_ab_test_but_runs_predictor() {
        let mut t = table(|_| 0);
        let report = run_analysis(&mut t, &fast_config()).unwrap();

        match &report.ab_test {
            AbTestOutcome::Skipped { reason } => assert!(reason.contains("pooled variance")),
            other => panic!("Expected skipped A/B test, got {:?}", other),
        }
        assert!(report.predictor.is_some());
        assert!(report.to_report_string().contains("A/B TEST SKIPPED"));
    }

    #[test]
    fn test_predictor_disabled() {
        let mut t = table(|i| (i % 3) as u64);
        let mut config = fast_config();
        config.predictor.enabled = false;

        let report = run_analysis(&mut t, &config).unwrap();
        assert!(report.predictor.is_none());
        assert!(!report.to_report_string().contains("CLICK PREDICTOR"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut t = table(|_| 1);
        let mut config = fast_config();
        config.eda.histogram_bins = 0;
        assert!(run_analysis(&mut t, &config).is_err());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut t = table(|i| (i % 4) as u64);
        let report = run_analysis(&mut t, &fast_config()).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ab_test"]["status"], "completed");
        assert!(json["ab_test"]["test"]["pvalue"].is_number());
        assert!(json["predictor"]["report"]["classes"].is_array());
        assert!(json["eda"]["histogram"]["bins"].is_array());
    }
}
