//! Campaign table loading from CSV exports
//!
//! One row per ad, with the demographic band it targeted and its delivery
//! counters. Derived columns (CTR, click label, A/B variant) live on the
//! record so every stage reads the same table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a campaign table
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV at row {row}: {message}")]
    Malformed { row: usize, message: String },

    #[error("Row {row} has {clicks} clicks but only {impressions} impressions")]
    ClicksExceedImpressions {
        row: usize,
        clicks: u64,
        impressions: u64,
    },

    #[error("Row {row} has a negative or non-finite spend ({spend})")]
    InvalidSpend { row: usize, spend: f64 },

    #[error("CSV contains no data rows")]
    Empty,
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Synthetic A/B variant label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw CSV row as exported by the ads manager
///
/// Header names vary between exports (`age` vs `Age`, `Spent` vs `Spend`),
/// unknown columns such as `ad_id` or `interest` are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "age", alias = "AGE")]
    #[serde(rename = "Age")]
    age: String,
    #[serde(alias = "gender", alias = "GENDER")]
    #[serde(rename = "Gender")]
    gender: String,
    #[serde(alias = "impressions")]
    #[serde(rename = "Impressions")]
    impressions: u64,
    #[serde(alias = "clicks")]
    #[serde(rename = "Clicks")]
    clicks: u64,
    #[serde(alias = "Spent", alias = "spend", alias = "spent")]
    #[serde(rename = "Spend")]
    spend: f64,
}

/// A single campaign row with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub age: String,
    pub gender: String,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    /// Filled by the A/B assignment stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
}

impl CampaignRecord {
    pub fn new(
        age: impl Into<String>,
        gender: impl Into<String>,
        impressions: u64,
        clicks: u64,
        spend: f64,
    ) -> Self {
        Self {
            age: age.into(),
            gender: gender.into(),
            impressions,
            clicks,
            spend,
            variant: None,
        }
    }

    /// Click-through rate, `None` when the ad was never shown
    pub fn ctr(&self) -> Option<f64> {
        if self.impressions == 0 {
            None
        } else {
            Some(self.clicks as f64 / self.impressions as f64)
        }
    }

    /// Binary click label used as the classifier target
    pub fn clicked(&self) -> u8 {
        u8::from(self.clicks > 0)
    }
}

/// In-memory campaign table, row order is preserved from the source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignTable {
    records: Vec<CampaignRecord>,
}

impl CampaignTable {
    /// Build a table from records, checking the clicks <= impressions invariant
    pub fn from_records(records: Vec<CampaignRecord>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            validate_record(i + 1, record)?;
        }
        Ok(Self { records })
    }

    /// Load a table from a CSV file with a header row
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            "Loaded {} campaign rows from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Load a table from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (i, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            // Row numbers are 1-based data rows (header excluded)
            let row_number = i + 1;
            let row = row.map_err(|e| DatasetError::Malformed {
                row: row_number,
                message: e.to_string(),
            })?;
            let record = CampaignRecord::new(
                row.age,
                row.gender,
                row.impressions,
                row.clicks,
                row.spend,
            );
            validate_record(row_number, &record)?;
            records.push(record);
        }

        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [CampaignRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once every row carries a variant label
    pub fn has_variants(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.variant.is_some())
    }
}

fn validate_record(row: usize, record: &CampaignRecord) -> Result<()> {
    if record.clicks > record.impressions {
        return Err(DatasetError::ClicksExceedImpressions {
            row,
            clicks: record.clicks,
            impressions: record.impressions,
        });
    }
    if !record.spend.is_finite() || record.spend < 0.0 {
        return Err(DatasetError::InvalidSpend {
            row,
            spend: record.spend,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ad_id,age,gender,interest,Impressions,Clicks,Spent
708746,30-34,M,15,7350,1,1.43
708749,30-34,M,16,17861,2,1.82
708771,35-39,F,20,693,0,0
";

    #[test]
    fn test_load_kaggle_style_headers() {
        let table = CampaignTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);

        let first = &table.records()[0];
        assert_eq!(first.age, "30-34");
        assert_eq!(first.gender, "M");
        assert_eq!(first.impressions, 7350);
        assert_eq!(first.clicks, 1);
        assert!((first.spend - 1.43).abs() < 1e-12);
        assert!(first.variant.is_none());
    }

    #[test]
    fn test_load_canonical_headers() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n25-29, F ,100,10,2.5\n";
        let table = CampaignTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.records()[0].gender, "F");
        assert_eq!(table.records()[0].ctr(), Some(0.1));
    }

    #[test]
    fn test_ctr_undefined_for_zero_impressions() {
        let record = CampaignRecord::new("30-34", "M", 0, 0, 0.0);
        assert_eq!(record.ctr(), None);
        assert_eq!(record.clicked(), 0);
    }

    #[test]
    fn test_ctr_matches_ratio() {
        let record = CampaignRecord::new("30-34", "M", 400, 3, 1.0);
        assert_eq!(record.ctr(), Some(3.0 / 400.0));
        assert_eq!(record.clicked(), 1);
    }

    #[test]
    fn test_clicks_exceeding_impressions_rejected() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n30-34,M,5,6,1.0\n";
        let err = CampaignTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::ClicksExceedImpressions { row: 1, clicks: 6, impressions: 5 }
        ));
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n30-34,M,lots,1,1.0\n";
        let err = CampaignTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { row: 1, .. }));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let csv = "Age,Gender,Impressions,Spend\n30-34,M,10,1.0\n";
        let err = CampaignTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed { .. }));
    }

    #[test]
    fn test_negative_spend_rejected() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n30-34,M,10,1,-2.0\n";
        let err = CampaignTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidSpend { row: 1, .. }));
    }

    #[test]
    fn test_header_only_is_empty() {
        let csv = "Age,Gender,Impressions,Clicks,Spend\n";
        assert!(matches!(
            CampaignTable::from_reader(csv.as_bytes()),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = CampaignTable::from_path("/nonexistent/facebook_ads.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/facebook_ads.csv"));
    }

    #[test]
    fn test_has_variants() {
        let mut table = CampaignTable::from_records(vec![
            CampaignRecord::new("30-34", "M", 10, 1, 1.0),
            CampaignRecord::new("35-39", "F", 10, 2, 1.0),
        ])
        .unwrap();
        assert!(!table.has_variants());

        for record in table.records_mut() {
            record.variant = Some(Variant::B);
        }
        assert!(table.has_variants());
    }
}
