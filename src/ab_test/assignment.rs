// Seeded variant assignment and per-variant aggregation

use crate::ab_test::{AbTestError, Result};
use crate::dataset::{CampaignTable, Variant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Summed delivery counters for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub variant: Variant,
    pub rows: usize,
    pub impressions: u64,
    pub clicks: u64,
}

impl GroupAggregate {
    fn empty(variant: Variant) -> Self {
        Self {
            variant,
            rows: 0,
            impressions: 0,
            clicks: 0,
        }
    }

    /// Group CTR, `None` when the group has no impressions
    pub fn ctr(&self) -> Option<f64> {
        if self.impressions == 0 {
            None
        } else {
            Some(self.clicks as f64 / self.impressions as f64)
        }
    }
}

/// Assign every row a variant drawn uniformly from {A, B}
///
/// The draw sequence depends only on `seed`, so the same seed over the same
/// row order always yields the same assignment. Existing labels are
/// overwritten.
pub fn assign_variants(table: &mut CampaignTable, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut count_b = 0usize;

    for record in table.records_mut() {
        let variant = if rng.gen_bool(0.5) {
            count_b += 1;
            Variant::B
        } else {
            Variant::A
        };
        record.variant = Some(variant);
    }

    tracing::info!(
        "Assigned variants with seed {}: A={} B={}",
        seed,
        table.len() - count_b,
        count_b
    );
}

/// Sum impressions and clicks per variant, returned in `[A, B]` order
///
/// A sum past `u64::MAX` is a `CountOverflow` error.
pub fn aggregate_groups(table: &CampaignTable) -> Result<[GroupAggregate; 2]> {
    let mut groups = [
        GroupAggregate::empty(Variant::A),
        GroupAggregate::empty(Variant::B),
    ];

    for (i, record) in table.records().iter().enumerate() {
        let variant = record
            .variant
            .ok_or(AbTestError::MissingVariant { row: i + 1 })?;
        let group = match variant {
            Variant::A => &mut groups[0],
            Variant::B => &mut groups[1],
        };
        group.rows += 1;
        group.impressions = group
            .impressions
            .checked_add(record.impressions)
            .ok_or(AbTestError::CountOverflow)?;
        group.clicks = group
            .clicks
            .checked_add(record.clicks)
            .ok_or(AbTestError::CountOverflow)?;
    }

    for group in &groups {
        tracing::debug!(
            "Variant {}: rows={} impressions={} clicks={}",
            group.variant,
            group.rows,
            group.impressions,
            group.clicks
        );
    }

    Ok(groups)
}
