//! Held-out evaluation: classification report and ROC AUC

use aprender::metrics::classification::{self, Average};
use serde::{Deserialize, Serialize};

/// Binary confusion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    /// Counts from aprender's row-major `[true][predicted]` confusion matrix
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let n = y_true.len().min(y_pred.len());
        let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);
        if n == 0 {
            return Self::default();
        }
        let (y_pred, y_true) = (as_classes(y_pred), as_classes(y_true));
        let matrix = classification::confusion_matrix(&y_pred, &y_true);

        // Only the classes seen in either slice are present
        let (rows, cols) = matrix.shape();
        let cell = |t: usize, p: usize| if t < rows && p < cols { matrix.get(t, p) } else { 0 };
        Self {
            true_negatives: cell(0, 0),
            false_positives: cell(0, 1),
            false_negatives: cell(1, 0),
            true_positives: cell(1, 1),
        }
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }
}

/// Precision/recall/F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows of this class
    pub support: usize,
}

/// Averaged metrics across classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics for classes 0 and 1 plus accuracy and averages
///
/// Ratios with a zero denominator are reported as 0.0. Averages cover the
/// classes that occur in the labels or predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion: ConfusionMatrix,
}

fn as_classes(labels: &[u8]) -> Vec<usize> {
    labels.iter().map(|&y| usize::from(y)).collect()
}

/// Metrics of one class from its true positive, false positive and false
/// negative counts
fn class_metrics(label: u8, tp: usize, fp: usize, fn_: usize) -> ClassMetrics {
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassMetrics {
        label,
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

/// Build the classification report for binary labels
pub fn classification_report(y_true: &[u8], y_pred: &[u8]) -> ClassificationReport {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred);

    // For class 0 the roles of positives and negatives swap
    let classes = vec![
        class_metrics(0, cm.true_negatives, cm.false_negatives, cm.false_positives),
        class_metrics(1, cm.true_positives, cm.false_positives, cm.false_negatives),
    ];

    let total = cm.total();
    if total == 0 {
        let zero = AverageMetrics {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            support: 0,
        };
        return ClassificationReport {
            classes,
            accuracy: 0.0,
            macro_avg: zero.clone(),
            weighted_avg: zero,
            confusion: cm,
        };
    }

    let n = y_true.len().min(y_pred.len());
    let (y_pred, y_true) = (as_classes(&y_pred[..n]), as_classes(&y_true[..n]));
    let average = |average: Average| AverageMetrics {
        precision: f64::from(classification::precision(&y_pred, &y_true, average)),
        recall: f64::from(classification::recall(&y_pred, &y_true, average)),
        f1: f64::from(classification::f1_score(&y_pred, &y_true, average)),
        support: total,
    };

    ClassificationReport {
        accuracy: f64::from(classification::accuracy(&y_pred, &y_true)),
        macro_avg: average(Average::Macro),
        weighted_avg: average(Average::Weighted),
        classes,
        confusion: cm,
    }
}

/// Area under the ROC curve from raw scores
///
/// Computed as the Mann-Whitney rank statistic with average ranks for ties.
/// `None` when `y_true` holds a single class, since the curve is undefined.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || y_true.len() != scores.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share the mean rank of their run
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = mean_rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

impl ClassificationReport {
    /// Tabular text rendering
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "{:>14} {:>10} {:>10} {:>10} {:>10}\n\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for c in &self.classes {
            report.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                c.label, c.precision, c.recall, c.f1, c.support
            ));
        }
        report.push('\n');
        report.push_str(&format!(
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}\n",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        ));
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            report.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                name, avg.precision, avg.recall, avg.f1, avg.support
            ));
        }
        report
    }
}
