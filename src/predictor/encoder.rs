//! Label encoding for categorical feature columns

use crate::predictor::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maps each distinct category to its index in the sorted vocabulary
///
/// Codes are assigned in lexicographic order, so fitting the same set of
/// values always yields the same mapping regardless of row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit the vocabulary of `column` from its observed values
    pub fn fit<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            column: column.into(),
            classes: classes.into_iter().collect(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Fitted vocabulary, sorted
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Encode one value, failing for categories outside the vocabulary
    pub fn transform(&self, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| PredictorError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Decode a code back to its category
    pub fn inverse_transform(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| PredictorError::UnknownCode {
                column: self.column.clone(),
                code,
                classes: self.classes.len(),
            })
    }
}
