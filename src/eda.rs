//! Exploratory CTR summary
//!
//! Computes per-row click-through rate, the CTR distribution and the mean CTR
//! per demographic group. Rows with zero impressions have no CTR: they are
//! counted in `undefined_ctr_rows` and left out of every statistic below.
//!
//! Vector statistics go through Trueno, the median through aprender's
//! `DescriptiveStats`.

use crate::dataset::{CampaignRecord, CampaignTable};
use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trueno::Vector;

/// Width of the widest bar in text charts
const BAR_WIDTH: usize = 40;

/// Descriptive statistics over defined CTR values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrStatistics {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// One equal-width histogram bucket, `[lower, upper)` except the last bucket
/// which also includes `upper`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// CTR distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Bucket `values` into `bins` equal-width bins spanning their range
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        if values.is_empty() || bins == 0 {
            return Self::default();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Constant column: one bucket holding everything
        if (max - min).abs() < f64::EPSILON {
            return Self {
                bins: vec![HistogramBin {
                    lower: min,
                    upper: max,
                    count: values.len(),
                }],
            };
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &value in values {
            let idx = (((value - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + width * i as f64,
                upper: if i + 1 == bins {
                    max
                } else {
                    min + width * (i + 1) as f64
                },
                count,
            })
            .collect();

        Self { bins }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Mean CTR for one value of a categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCtr {
    pub label: String,
    /// Rows in the group with a defined CTR
    pub rows: usize,
    pub mean_ctr: f64,
}

/// Campaign-wide delivery and cost totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignTotals {
    /// Summed in 128 bits, every u64 row count fits without overflow
    pub impressions: u128,
    pub clicks: u128,
    pub spend: f64,
    /// Total clicks over total impressions
    pub ctr: Option<f64>,
    /// Total spend over total clicks
    pub cost_per_click: Option<f64>,
}

/// Result of the exploratory stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSummary {
    pub rows: usize,
    pub undefined_ctr_rows: usize,
    pub ctr: Option<CtrStatistics>,
    pub histogram: Histogram,
    pub by_gender: Vec<GroupCtr>,
    pub by_age: Vec<GroupCtr>,
    pub totals: CampaignTotals,
}

/// Summarize the CTR distribution of a campaign table
pub fn summarize(table: &CampaignTable, bins: usize) -> EdaSummary {
    let records = table.records();
    let ctrs: Vec<f64> = records.iter().filter_map(CampaignRecord::ctr).collect();
    let undefined_ctr_rows = records.len() - ctrs.len();

    if undefined_ctr_rows > 0 {
        tracing::warn!(
            "{} rows have zero impressions, their CTR is undefined and excluded",
            undefined_ctr_rows
        );
    }

    let summary = EdaSummary {
        rows: records.len(),
        undefined_ctr_rows,
        ctr: ctr_statistics(&ctrs),
        histogram: Histogram::from_values(&ctrs, bins),
        by_gender: mean_ctr_by(records, |r| r.gender.as_str()),
        by_age: mean_ctr_by(records, |r| r.age.as_str()),
        totals: campaign_totals(records),
    };

    tracing::debug!(
        "CTR summary: {} defined values, {} histogram bins, {} genders, {} age bands",
        ctrs.len(),
        summary.histogram.bins.len(),
        summary.by_gender.len(),
        summary.by_age.len()
    );

    summary
}

/// Compute descriptive statistics with Trueno, `None` for an empty slice
fn ctr_statistics(ctrs: &[f64]) -> Option<CtrStatistics> {
    if ctrs.is_empty() {
        return None;
    }

    let values: Vec<f32> = ctrs.iter().map(|&c| c as f32).collect();
    let v = Vector::from_slice(&values);

    let mean = v.mean().unwrap_or(0.0);
    let stddev = v.stddev().unwrap_or(0.0);
    let min = v.min().unwrap_or(0.0);
    let max = v.max().unwrap_or(0.0);
    let median = DescriptiveStats::new(&v).quantile(0.5).unwrap_or(mean);

    Some(CtrStatistics {
        count: ctrs.len(),
        mean: f64::from(mean),
        stddev: f64::from(stddev),
        min: f64::from(min),
        max: f64::from(max),
        median: f64::from(median),
    })
}

/// Mean CTR grouped by a categorical column, sorted by group label
fn mean_ctr_by<'a, F>(records: &'a [CampaignRecord], key: F) -> Vec<GroupCtr>
where
    F: Fn(&'a CampaignRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for record in records {
        let Some(ctr) = record.ctr() else {
            continue;
        };
        let entry = groups.entry(key(record)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += ctr;
    }

    groups
        .into_iter()
        .map(|(label, (rows, sum))| GroupCtr {
            label: label.to_string(),
            rows,
            mean_ctr: sum / rows as f64,
        })
        .collect()
}

fn campaign_totals(records: &[CampaignRecord]) -> CampaignTotals {
    let impressions: u128 = records.iter().map(|r| u128::from(r.impressions)).sum();
    let clicks: u128 = records.iter().map(|r| u128::from(r.clicks)).sum();
    let spend: f64 = records.iter().map(|r| r.spend).sum();

    CampaignTotals {
        impressions,
        clicks,
        spend,
        ctr: (impressions > 0).then(|| clicks as f64 / impressions as f64),
        cost_per_click: (clicks > 0).then(|| spend / clicks as f64),
    }
}

/// Render a horizontal bar scaled against `max`
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.min(BAR_WIDTH))
}

impl EdaSummary {
    /// Generate human-readable report with text histogram and bar charts
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("📈 CTR DISTRIBUTION\n\n");
        report.push_str(&format!("Rows: {}\n", self.rows));
        if self.undefined_ctr_rows > 0 {
            report.push_str(&format!(
                "Rows with zero impressions (CTR undefined, excluded): {}\n",
                self.undefined_ctr_rows
            ));
        }

        let totals = &self.totals;
        report.push_str(&format!(
            "Impressions: {}  Clicks: {}  Spend: {:.2}\n",
            totals.impressions, totals.clicks, totals.spend
        ));
        if let Some(ctr) = totals.ctr {
            report.push_str(&format!("Overall CTR: {:.6}\n", ctr));
        }
        if let Some(cpc) = totals.cost_per_click {
            report.push_str(&format!("Cost per click: {:.4}\n", cpc));
        }

        match &self.ctr {
            Some(stats) => {
                report.push_str(&format!(
                    "CTR mean={:.6} std={:.6} min={:.6} median={:.6} max={:.6}\n",
                    stats.mean, stats.stddev, stats.min, stats.median, stats.max
                ));
            }
            None => report.push_str("No rows with a defined CTR\n"),
        }

        if !self.histogram.bins.is_empty() {
            report.push_str("\nHistogram of CTR:\n");
            let max_count = self
                .histogram
                .bins
                .iter()
                .map(|b| b.count)
                .max()
                .unwrap_or(0) as f64;
            for b in &self.histogram.bins {
                report.push_str(&format!(
                    "  [{:.5}, {:.5}] {:>6} {}\n",
                    b.lower,
                    b.upper,
                    b.count,
                    bar(b.count as f64, max_count)
                ));
            }
        }

        push_group_chart(&mut report, "Mean CTR by Gender", &self.by_gender);
        push_group_chart(&mut report, "Mean CTR by Age", &self.by_age);

        report
    }
}

fn push_group_chart(report: &mut String, title: &str, groups: &[GroupCtr]) {
    if groups.is_empty() {
        return;
    }
    report.push_str(&format!("\n{}:\n", title));
    let max = groups.iter().map(|g| g.mean_ctr).fold(0.0, f64::max);
    let width = groups.iter().map(|g| g.label.len()).max().unwrap_or(0);
    for g in groups {
        report.push_str(&format!(
            "  {:<width$} {:.6} {}\n",
            g.label,
            g.mean_ctr,
            bar(g.mean_ctr, max),
            width = width
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, u64, u64, f64)]) -> CampaignTable {
        CampaignTable::from_records(
            rows.iter()
                .map(|&(age, gender, imp, clk, spend)| {
                    CampaignRecord::new(age, gender, imp, clk, spend)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let values = vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        let hist = Histogram::from_values(&values, 4);

        assert_eq!(hist.bins.len(), 4);
        assert_eq!(hist.total(), values.len());
        // Maximum lands in the last bucket
        assert_eq!(hist.bins[3].upper, 1.0);
        assert!(hist.bins[3].count >= 1);
        assert_eq!(hist.bins[0].lower, 0.0);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = Histogram::from_values(&[0.25, 0.25, 0.25], 10);
        assert_eq!(hist.bins.len(), 1);
        assert_eq!(hist.bins[0].count, 3);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(Histogram::from_values(&[], 10).bins.is_empty());
    }

    #[test]
    fn test_summary_excludes_zero_impressions() {
        let t = table(&[
            ("30-34", "M", 100, 10, 1.0),
            ("30-34", "F", 0, 0, 0.0),
            ("35-39", "F", 100, 20, 2.0),
        ]);
        let summary = summarize(&t, 5);

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.undefined_ctr_rows, 1);
        let stats = summary.ctr.unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 0.15).abs() < 1e-6);
        assert!((stats.min - 0.1).abs() < 1e-6);
        assert!((stats.max - 0.2).abs() < 1e-6);
        assert_eq!(summary.histogram.total(), 2);
    }

    #[test]
    fn test_mean_ctr_by_gender() {
        let t = table(&[
            ("30-34", "M", 100, 10, 1.0),
            ("30-34", "M", 100, 30, 1.0),
            ("35-39", "F", 200, 10, 2.0),
        ]);
        let summary = summarize(&t, 5);

        assert_eq!(summary.by_gender.len(), 2);
        assert_eq!(summary.by_gender[0].label, "F");
        assert!((summary.by_gender[0].mean_ctr - 0.05).abs() < 1e-12);
        assert_eq!(summary.by_gender[1].label, "M");
        assert_eq!(summary.by_gender[1].rows, 2);
        assert!((summary.by_gender[1].mean_ctr - 0.2).abs() < 1e-12);

        assert_eq!(summary.by_age[0].label, "30-34");
        assert_eq!(summary.by_age[1].label, "35-39");
    }

    #[test]
    fn test_campaign_totals() {
        let t = table(&[("30-34", "M", 100, 4, 2.0), ("30-34", "F", 300, 0, 1.0)]);
        let totals = summarize(&t, 5).totals;

        assert_eq!(totals.impressions, 400);
        assert_eq!(totals.clicks, 4);
        assert_eq!(totals.ctr, Some(0.01));
        assert_eq!(totals.cost_per_click, Some(0.75));
    }

    #[test]
    fn test_cost_per_click_undefined_without_clicks() {
        let t = table(&[("30-34", "M", 100, 0, 2.0)]);
        assert_eq!(summarize(&t, 5).totals.cost_per_click, None);
    }

    #[test]
    fn test_totals_beyond_u64() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n\
                   30-34,M,10000000000000000000,1,1.0\n\
                   35-39,F,10000000000000000000,3,1.0\n";
        let t = CampaignTable::from_reader(csv.as_bytes()).unwrap();
        let totals = summarize(&t, 5).totals;
        assert_eq!(totals.impressions, 20_000_000_000_000_000_000);
        assert_eq!(totals.clicks, 4);
        assert_eq!(totals.cost_per_click, Some(0.5));
    }

    #[test]
    fn test_all_rows_undefined() {
        let t = table(&[("30-34", "M", 0, 0, 0.0)]);
        let summary = summarize(&t, 5);
        assert!(summary.ctr.is_none());
        assert!(summary.histogram.bins.is_empty());
        assert!(summary.by_gender.is_empty());
        assert!(summary.to_report_string().contains("No rows with a defined CTR"));
    }

    #[test]
    fn test_report_string_contains_charts() {
        let t = table(&[("30-34", "M", 100, 10, 1.0), ("35-39", "F", 100, 20, 2.0)]);
        let report = summarize(&t, 3).to_report_string();

        assert!(report.contains("Histogram of CTR"));
        assert!(report.contains("Mean CTR by Gender"));
        assert!(report.contains("Mean CTR by Age"));
        assert!(report.contains('█'));
    }
}
