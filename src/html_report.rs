//! HTML output format for analysis reports
//!
//! Self-contained page with embedded CSS: bar charts for the CTR
//! distribution and group means, A/B and classification tables.

use crate::ab_test::AbTestResult;
use crate::analysis::{AbTestOutcome, AnalysisReport};
use crate::eda::{EdaSummary, GroupCtr};
use crate::predictor::PredictorReport;

/// HTML output formatter
#[derive(Debug)]
pub struct HtmlReport<'a> {
    report: &'a AnalysisReport,
    title: String,
}

impl<'a> HtmlReport<'a> {
    /// Create a formatter for `report`, labelled with the input file name
    pub fn new(report: &'a AnalysisReport, source: &str) -> Self {
        Self {
            report,
            title: format!("Campaign Analysis: {}", source),
        }
    }

    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Generate embedded CSS styles
    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .num {
            font-family: monospace;
            text-align: right;
        }
        .bar-cell {
            width: 60%;
        }
        .bar {
            background-color: #4a90d9;
            height: 14px;
        }
        .verdict {
            font-size: 1.2em;
            font-weight: bold;
            padding: 10px;
            background-color: white;
            margin-bottom: 20px;
        }
        .significant {
            color: #2e7d32;
        }
        .not-significant {
            color: #666;
        }
        .skipped {
            color: #cc0000;
        }
        .stats-table th {
            background-color: #5cb85c;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    /// Generate complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!(
            "    <title>{}</title>\n",
            Self::escape_html(&self.title)
        ));
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str(&format!("    <h1>{}</h1>\n", Self::escape_html(&self.title)));

        html.push_str(&Self::render_eda(&self.report.eda));

        html.push_str("    <h2>A/B Test</h2>\n");
        match &self.report.ab_test {
            AbTestOutcome::Completed(result) => html.push_str(&Self::render_ab_test(result)),
            AbTestOutcome::Skipped { reason } => html.push_str(&format!(
                "    <div class=\"verdict skipped\">A/B test skipped: {}</div>\n",
                Self::escape_html(reason)
            )),
        }

        if let Some(predictor) = &self.report.predictor {
            html.push_str(&Self::render_predictor(predictor));
        }

        html.push_str("    <div class=\"footer\">\n");
        html.push_str(&format!(
            "        Generated by adlift {}\n",
            env!("CARGO_PKG_VERSION")
        ));
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }

    /// Table row with a bar proportional to `value / max`
    fn bar_row(label: &str, value_text: &str, value: f64, max: f64) -> String {
        let width = if max > 0.0 { value / max * 100.0 } else { 0.0 };
        format!(
            "        <tr><td>{}</td><td class=\"num\">{}</td><td class=\"bar-cell\"><div class=\"bar\" style=\"width: {:.1}%\"></div></td></tr>\n",
            Self::escape_html(label),
            Self::escape_html(value_text),
            width
        )
    }

    fn render_groups(heading: &str, groups: &[GroupCtr]) -> String {
        let mut html = String::new();
        html.push_str(&format!("    <h3>{}</h3>\n", Self::escape_html(heading)));
        html.push_str("    <table>\n");
        html.push_str("        <tr><th>Group</th><th>Mean CTR</th><th></th></tr>\n");

        let max = groups.iter().map(|g| g.mean_ctr).fold(0.0, f64::max);
        for group in groups {
            html.push_str(&Self::bar_row(
                &group.label,
                &format!("{:.6}", group.mean_ctr),
                group.mean_ctr,
                max,
            ));
        }

        html.push_str("    </table>\n");
        html
    }

    fn render_eda(eda: &EdaSummary) -> String {
        let mut html = String::new();

        html.push_str("    <h2>CTR Distribution</h2>\n");
        html.push_str("    <table class=\"stats-table\">\n");
        html.push_str("        <tr><th>rows</th><th>undefined CTR</th><th>mean</th><th>std</th><th>min</th><th>median</th><th>max</th></tr>\n");
        match &eda.ctr {
            Some(s) => html.push_str(&format!(
                "        <tr><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{:.6}</td><td class=\"num\">{:.6}</td><td class=\"num\">{:.6}</td><td class=\"num\">{:.6}</td><td class=\"num\">{:.6}</td></tr>\n",
                eda.rows, eda.undefined_ctr_rows, s.mean, s.stddev, s.min, s.median, s.max
            )),
            None => html.push_str(&format!(
                "        <tr><td class=\"num\">{}</td><td class=\"num\">{}</td><td colspan=\"5\">no defined CTR values</td></tr>\n",
                eda.rows, eda.undefined_ctr_rows
            )),
        }
        html.push_str("    </table>\n");

        if !eda.histogram.bins.is_empty() {
            html.push_str("    <table>\n");
            html.push_str("        <tr><th>CTR range</th><th>Rows</th><th></th></tr>\n");
            let max = eda.histogram.bins.iter().map(|b| b.count).max().unwrap_or(0);
            for bin in &eda.histogram.bins {
                html.push_str(&Self::bar_row(
                    &format!("{:.4} - {:.4}", bin.lower, bin.upper),
                    &bin.count.to_string(),
                    bin.count as f64,
                    max as f64,
                ));
            }
            html.push_str("    </table>\n");
        }

        html.push_str(&Self::render_groups("Mean CTR by Gender", &eda.by_gender));
        html.push_str(&Self::render_groups("Mean CTR by Age", &eda.by_age));
        html
    }

    fn render_ab_test(result: &AbTestResult) -> String {
        let mut html = String::new();

        let (class, text) = if result.significant {
            ("significant", "Significant CTR difference")
        } else {
            ("not-significant", "No significant CTR difference")
        };
        html.push_str(&format!(
            "    <div class=\"verdict {}\">{} (p = {:.6}, alpha = {})</div>\n",
            class, text, result.test.pvalue, result.significance_level
        ));

        html.push_str("    <table>\n");
        html.push_str("        <tr><th>Variant</th><th>Rows</th><th>Impressions</th><th>Clicks</th><th>CTR</th></tr>\n");
        for group in &result.groups {
            html.push_str(&format!(
                "        <tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
                group.variant,
                group.rows,
                group.impressions,
                group.clicks,
                group
                    .ctr()
                    .map(|c| format!("{:.6}", c))
                    .unwrap_or_else(|| "n/a".to_string())
            ));
        }
        html.push_str("    </table>\n");

        html.push_str("    <table class=\"stats-table\">\n");
        html.push_str("        <tr><th>z</th><th>p-value</th><th>lift (B - A)</th><th>relative lift</th><th>95% CI</th></tr>\n");
        html.push_str(&format!(
            "        <tr><td class=\"num\">{:.4}</td><td class=\"num\">{:.6}</td><td class=\"num\">{:.6}</td><td class=\"num\">{}</td><td class=\"num\">[{:.6}, {:.6}]</td></tr>\n",
            result.test.statistic,
            result.test.pvalue,
            result.absolute_lift,
            result
                .relative_lift
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
            result.confidence_interval.0,
            result.confidence_interval.1
        ));
        html.push_str("    </table>\n");
        html
    }

    fn render_predictor(predictor: &PredictorReport) -> String {
        let mut html = String::new();

        html.push_str("    <h2>Click Predictor</h2>\n");
        html.push_str(&format!(
            "    <p>Features: {}. Rows: train {}, validation {}, test {}.</p>\n",
            Self::escape_html(&predictor.feature_columns.join(", ")),
            predictor.history.train_rows,
            predictor.history.validation_rows,
            predictor.test_rows
        ));

        html.push_str("    <table>\n");
        html.push_str("        <tr><th>Epoch</th><th>loss</th><th>accuracy</th><th>val_loss</th><th>val_accuracy</th></tr>\n");
        let fmt_opt = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_default();
        for e in &predictor.history.epochs {
            html.push_str(&format!(
                "        <tr><td>{}</td><td class=\"num\">{:.4}</td><td class=\"num\">{:.4}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
                e.epoch,
                e.loss,
                e.accuracy,
                fmt_opt(e.val_loss),
                fmt_opt(e.val_accuracy)
            ));
        }
        html.push_str("    </table>\n");

        let report = &predictor.report;
        html.push_str("    <table class=\"stats-table\">\n");
        html.push_str("        <tr><th></th><th>precision</th><th>recall</th><th>f1-score</th><th>support</th></tr>\n");
        for c in &report.classes {
            html.push_str(&format!(
                "        <tr><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{}</td></tr>\n",
                c.label, c.precision, c.recall, c.f1, c.support
            ));
        }
        for (name, avg) in [
            ("macro avg", &report.macro_avg),
            ("weighted avg", &report.weighted_avg),
        ] {
            html.push_str(&format!(
                "        <tr><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{}</td></tr>\n",
                name, avg.precision, avg.recall, avg.f1, avg.support
            ));
        }
        html.push_str("    </table>\n");

        html.push_str(&format!(
            "    <p>Accuracy: {:.4}. AUC Score: {}</p>\n",
            report.accuracy,
            predictor
                .auc
                .map(|a| format!("{:.4}", a))
                .unwrap_or_else(|| "undefined (single class in test subset)".to_string())
        ));
        html
    }
}
