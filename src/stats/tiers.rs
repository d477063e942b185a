// src/stats/tiers.rs

use crate::config::TierSpec;
use crate::error::{Result, StatsError};
use crate::types::{AlignmentRecord, AlignmentTable, BestHitTier, ThresholdSet, TierSummary};

/// Build one tier per `TierSpec`, in the order given.
///
/// A record belongs to a tier when `bitscore >= threshold`, so ties at the
/// cut-off can make a tier larger than `(1 - p/100) * n`. Record lists are
/// only materialized for tiers with `persist_full_table`; every tier gets its
/// count.
pub fn build_tiers<'a>(
    table: &'a AlignmentTable,
    thresholds: &ThresholdSet,
    specs: &[TierSpec],
) -> Result<Vec<BestHitTier<'a>>> {
    specs
        .iter()
        .map(|spec| -> Result<BestHitTier<'a>> {
            let threshold = thresholds.get(spec.percentile).ok_or_else(|| {
                StatsError::invalid_percentile(spec.percentile, "no threshold computed for tier")
            })?;

            let tier = if spec.persist_full_table {
                let records = tier_records(table, threshold);
                BestHitTier {
                    percentile: spec.percentile,
                    threshold,
                    count: records.len(),
                    records: Some(records),
                }
            } else {
                BestHitTier {
                    percentile: spec.percentile,
                    threshold,
                    count: count_at_or_above(table, threshold),
                    records: None,
                }
            };
            log::info!(
                "Best hits at percentile {} (bitscore >= {}): {}",
                tier.percentile,
                tier.threshold,
                tier.count
            );
            Ok(tier)
        })
        .collect()
}

/// Records with `bitscore >= threshold`, best first. Equal scores keep input order.
pub fn tier_records(table: &AlignmentTable, threshold: f64) -> Vec<&AlignmentRecord> {
    let mut records: Vec<&AlignmentRecord> =
        table.iter().filter(|r| r.bitscore >= threshold).collect();
    records.sort_by(|a, b| b.bitscore.total_cmp(&a.bitscore));
    records
}

pub fn count_at_or_above(table: &AlignmentTable, threshold: f64) -> usize {
    table.iter().filter(|r| r.bitscore >= threshold).count()
}

pub fn summarize_tiers(tiers: &[BestHitTier<'_>]) -> Vec<TierSummary> {
    tiers
        .iter()
        .map(|t| TierSummary {
            percentile: t.percentile,
            threshold: t.threshold,
            count: t.count,
        })
        .collect()
}
