//! Click prediction from demographic and variant features
//!
//! Pipeline: derive the `clicked` label, label-encode `Gender`, `Age` and
//! `ad_variant`, split rows 80/20 with a seeded shuffle, train a small
//! feed-forward classifier and evaluate it on the untouched 20%.
//!
//! Encoders are fitted on the full table before splitting, so every row of
//! both subsets is inside the vocabulary. Encoding rows from another table
//! with a category the encoder never saw is an `UnknownCategory` error.

mod encoder;
mod metrics;
mod network;
mod split;

pub use encoder::LabelEncoder;
pub use metrics::{
    classification_report, roc_auc, AverageMetrics, ClassMetrics, ClassificationReport,
    ConfusionMatrix,
};
pub use network::{
    binary_cross_entropy, ClickClassifier, EpochMetrics, TrainingHistory, TrainingOptions,
};
pub use split::{train_test_split, TrainTestSplit};

use crate::config::PredictorConfig;
use crate::dataset::{CampaignRecord, CampaignTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feature columns, in matrix column order
pub const FEATURE_COLUMNS: [&str; 3] = ["Gender", "Age", "ad_variant"];

/// Errors for click prediction
#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Row {row} has no ad_variant; run the A/B stage first")]
    MissingVariant { row: usize },

    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: String, value: String },

    #[error("Code {code} out of range for column {column} ({classes} classes)")]
    UnknownCode {
        column: String,
        code: usize,
        classes: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, PredictorError>;

/// One fitted encoder per feature column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoders {
    pub gender: LabelEncoder,
    pub age: LabelEncoder,
    pub variant: LabelEncoder,
}

impl FeatureEncoders {
    /// Fit the three encoders on every row of `table`
    pub fn fit(table: &CampaignTable) -> Result<Self> {
        let variants = variant_labels(table.records())?;
        Ok(Self {
            gender: LabelEncoder::fit(FEATURE_COLUMNS[0], table.records().iter().map(|r| &r.gender)),
            age: LabelEncoder::fit(FEATURE_COLUMNS[1], table.records().iter().map(|r| &r.age)),
            variant: LabelEncoder::fit(FEATURE_COLUMNS[2], variants),
        })
    }

    /// Encode one record as `[gender, age, ad_variant]` codes
    pub fn encode(&self, row: usize, record: &CampaignRecord) -> Result<Vec<f64>> {
        let variant = record
            .variant
            .ok_or(PredictorError::MissingVariant { row })?;
        Ok(vec![
            self.gender.transform(&record.gender)? as f64,
            self.age.transform(&record.age)? as f64,
            self.variant.transform(variant.as_str())? as f64,
        ])
    }

    /// Encode every record of `table`
    pub fn encode_table(&self, table: &CampaignTable) -> Result<Vec<Vec<f64>>> {
        table
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| self.encode(i + 1, record))
            .collect()
    }

    /// Fitted vocabularies in feature column order
    pub fn vocabularies(&self) -> Vec<(String, Vec<String>)> {
        [&self.gender, &self.age, &self.variant]
            .into_iter()
            .map(|e| (e.column().to_string(), e.classes().to_vec()))
            .collect()
    }
}

fn variant_labels(records: &[CampaignRecord]) -> Result<Vec<&'static str>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.variant
                .map(|v| v.as_str())
                .ok_or(PredictorError::MissingVariant { row: i + 1 })
        })
        .collect()
}

/// Outcome of training and held-out evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorReport {
    pub feature_columns: Vec<String>,
    pub vocabularies: Vec<(String, Vec<String>)>,
    pub layer_sizes: Vec<usize>,
    pub test_rows: usize,
    /// Share of rows labelled clicked across the whole table
    pub positive_rate: f64,
    pub history: TrainingHistory,
    pub report: ClassificationReport,
    /// ROC AUC on the test subset, `None` when it holds a single class
    pub auc: Option<f64>,
}

impl PredictorReport {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("🤖 CLICK PREDICTOR\n\n");
        report.push_str(&format!("Features: {}\n", self.feature_columns.join(", ")));
        for (column, classes) in &self.vocabularies {
            report.push_str(&format!("  {} codes: {}\n", column, classes.join(" | ")));
        }
        report.push_str(&format!(
            "Layers: {} → {}\n",
            self.feature_columns.len(),
            self.layer_sizes
                .iter()
                .map(|u| u.to_string())
                .collect::<Vec<_>>()
                .join(" → ")
        ));
        report.push_str(&format!(
            "Rows: train={} validation={} test={}  (clicked rate {:.3})\n",
            self.history.train_rows, self.history.validation_rows, self.test_rows, self.positive_rate
        ));

        report.push_str("\nTraining history:\n");
        for e in &self.history.epochs {
            report.push_str(&format!(
                "  Epoch {:>3}: loss={:.4} accuracy={:.4}",
                e.epoch, e.loss, e.accuracy
            ));
            if let (Some(vl), Some(va)) = (e.val_loss, e.val_accuracy) {
                report.push_str(&format!(" val_loss={:.4} val_accuracy={:.4}", vl, va));
            }
            report.push('\n');
        }

        report.push_str("\nClassification report (test subset):\n");
        report.push_str(&self.report.to_report_string());
        match self.auc {
            Some(auc) => report.push_str(&format!("\nAUC Score: {:.4}\n", auc)),
            None => report.push_str("\nAUC Score: undefined (test subset has a single class)\n"),
        }

        report
    }
}

/// Train the click classifier on `table` and evaluate it on a held-out split
///
/// Requires every row to carry an A/B variant.
pub fn run_predictor(table: &CampaignTable, config: &PredictorConfig) -> Result<PredictorReport> {
    if table.is_empty() {
        return Err(PredictorError::InsufficientData {
            required: 2,
            actual: 0,
        });
    }

    let encoders = FeatureEncoders::fit(table)?;
    let features = encoders.encode_table(table)?;
    let labels: Vec<u8> = table.records().iter().map(CampaignRecord::clicked).collect();
    let positives = labels.iter().filter(|&&y| y == 1).count();

    tracing::info!(
        "Encoded {} rows: {} gender, {} age and {} variant categories, {} clicked",
        features.len(),
        encoders.gender.len(),
        encoders.age.len(),
        encoders.variant.len(),
        positives
    );

    let split = train_test_split(features.len(), config.test_fraction, config.seed)?;
    let select = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<u8>) {
        indices
            .iter()
            .map(|&i| (features[i].clone(), labels[i]))
            .unzip()
    };
    let (train_x, train_y) = select(&split.train);
    let (test_x, test_y) = select(&split.test);

    let mut classifier =
        ClickClassifier::new(FEATURE_COLUMNS.len(), &config.hidden_units, config.seed);
    let history = classifier.fit(
        &train_x,
        &train_y,
        &TrainingOptions {
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            validation_fraction: config.validation_fraction,
            seed: config.seed,
        },
    )?;

    let probabilities = classifier.predict_proba_batch(&test_x);
    let predictions: Vec<u8> = probabilities
        .iter()
        .map(|&p| u8::from(p > config.decision_threshold))
        .collect();

    let report = classification_report(&test_y, &predictions);
    let auc = roc_auc(&test_y, &probabilities);
    if auc.is_none() {
        tracing::warn!("Test subset contains a single class, AUC is undefined");
    }

    tracing::info!(
        "Held-out evaluation: accuracy={:.4} auc={:?}",
        report.accuracy,
        auc
    );

    Ok(PredictorReport {
        feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        vocabularies: encoders.vocabularies(),
        layer_sizes: classifier.layer_sizes(),
        test_rows: test_x.len(),
        positive_rate: positives as f64 / labels.len() as f64,
        history,
        report,
        auc,
    })
}
