// src/stats/reference_profile.rs

use ahash::AHashMap;

use crate::config::NormalizationBasis;
use crate::error::{Result, StatsError};
use crate::types::{AlignmentTable, ReferenceProfile, ReferenceProfiles, RunMetadata, ThresholdSet};

/// Scale of the normalized hit rate: hits per million bases (or reads).
pub const PER_MILLION: f64 = 1_000_000.0;

/// Running totals for one reference during the grouping pass.
#[derive(Debug, Clone)]
struct ReferenceAggregate<'a> {
    reference_id: &'a str,
    hit_count: u64,
    /// Best bitscore among this reference's records. A reference is in a tier
    /// exactly when this reaches the tier threshold.
    max_bitscore: f64,
}

/// Depth divisor for the chosen basis; zero or absent counts are rejected.
pub fn normalization_depth(metadata: &RunMetadata, basis: NormalizationBasis) -> Result<u64> {
    match basis {
        NormalizationBasis::Bases => match metadata.base_count {
            Some(0) => Err(StatsError::invalid_metadata(
                "base_count",
                "must be a positive integer, got 0",
            )),
            Some(n) => Ok(n),
            None => Err(StatsError::invalid_metadata(
                "base_count",
                "required for base-normalized reference profiles",
            )),
        },
        NormalizationBasis::Reads => match metadata.read_count {
            0 => Err(StatsError::invalid_metadata(
                "read_count",
                "must be a positive integer, got 0",
            )),
            n => Ok(n),
        },
    }
}

/// One row per distinct `reference_id`, in first-seen order.
///
/// `hit_count_normalized = hit_count / depth * 1_000_000` where `depth` is the
/// base count (or read count, for [`NormalizationBasis::Reads`]). A flag is
/// set for each threshold the reference's best record reaches; references
/// below every threshold still get a row with all flags false.
pub fn build_reference_profiles(
    table: &AlignmentTable,
    thresholds: &ThresholdSet,
    metadata: &RunMetadata,
    basis: NormalizationBasis,
) -> Result<ReferenceProfiles> {
    let depth = normalization_depth(metadata, basis)? as f64;

    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut aggregates: Vec<ReferenceAggregate> = Vec::new();

    for record in table {
        let slot = *index
            .entry(record.reference_id.as_str())
            .or_insert_with(|| {
                aggregates.push(ReferenceAggregate {
                    reference_id: record.reference_id.as_str(),
                    hit_count: 0,
                    max_bitscore: f64::NEG_INFINITY,
                });
                aggregates.len() - 1
            });
        let agg = &mut aggregates[slot];
        agg.hit_count += 1;
        if record.bitscore > agg.max_bitscore {
            agg.max_bitscore = record.bitscore;
        }
    }

    let rows: Vec<ReferenceProfile> = aggregates
        .into_iter()
        .map(|agg| ReferenceProfile {
            reference_id: agg.reference_id.to_string(),
            hit_count: agg.hit_count,
            hit_count_normalized: agg.hit_count as f64 / depth * PER_MILLION,
            in_tier: thresholds
                .iter()
                .map(|(_, threshold)| agg.max_bitscore >= threshold)
                .collect(),
        })
        .collect();

    log::info!(
        "Profiled {} reference sequences ({} hits, depth {} {:?})",
        rows.len(),
        table.len(),
        depth,
        basis
    );

    Ok(ReferenceProfiles {
        percentiles: thresholds.percentiles(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierSpec;
    use crate::stats::percentile::compute_thresholds;
    use crate::stats::tiers::build_tiers;
    use crate::types::AlignmentRecord;

    fn rec(q: &str, r: &str, bitscore: f64) -> AlignmentRecord {
        AlignmentRecord {
            query_id: q.to_string(),
            reference_id: r.to_string(),
            percent_identity: 95.0,
            query_start: 1,
            query_end: 80,
            ref_start: 1,
            ref_end: 80,
            e_value: 1e-10,
            bitscore,
            query_length: 80,
            ref_length: 400,
            alignment_cigar: "80M".to_string(),
        }
    }

    fn five_hits() -> AlignmentTable {
        AlignmentTable::new(vec![
            rec("q1", "r1", 10.0),
            rec("q2", "r2", 12.0),
            rec("q3", "r1", 30.0),
            rec("q4", "r1", 11.0),
            rec("q5", "r1", 9.0),
        ])
    }

    #[test]
    fn test_normalized_by_base_count() {
        let table = five_hits();
        let thresholds = compute_thresholds(&table, &[50.0]).unwrap();
        let meta = RunMetadata::with_counts(10, Some(2_000_000));
        let profiles =
            build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();

        assert_eq!(profiles.rows.len(), 2);
        let r1 = &profiles.rows[0];
        let r2 = &profiles.rows[1];
        assert_eq!((r1.reference_id.as_str(), r1.hit_count), ("r1", 4));
        assert_eq!((r2.reference_id.as_str(), r2.hit_count), ("r2", 1));
        assert!((r1.hit_count_normalized - 2.0).abs() < 1e-12);
        assert!((r2.hit_count_normalized - 0.5).abs() < 1e-12);
        for row in &profiles.rows {
            assert_eq!(
                row.hit_count_normalized,
                row.hit_count as f64 / 2_000_000.0 * 1_000_000.0
            );
        }
    }

    #[test]
    fn test_read_basis_uses_read_count() {
        let table = five_hits();
        let thresholds = compute_thresholds(&table, &[50.0]).unwrap();
        let meta = RunMetadata::with_counts(4_000_000, None);
        let profiles =
            build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Reads).unwrap();
        assert!((profiles.rows[0].hit_count_normalized - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_or_missing_depth_is_rejected() {
        let table = five_hits();
        let thresholds = compute_thresholds(&table, &[50.0]).unwrap();

        let zero = RunMetadata::with_counts(10, Some(0));
        let err = build_reference_profiles(&table, &thresholds, &zero, NormalizationBasis::Bases)
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidMetadata { field: "base_count", .. }));

        let missing = RunMetadata::with_counts(10, None);
        assert!(
            build_reference_profiles(&table, &thresholds, &missing, NormalizationBasis::Bases)
                .is_err()
        );

        let no_reads = RunMetadata::with_counts(0, Some(100));
        assert!(
            build_reference_profiles(&table, &thresholds, &no_reads, NormalizationBasis::Reads)
                .is_err()
        );
    }

    #[test]
    fn test_flags_match_tier_membership() {
        let table: AlignmentTable = (0..300)
            .map(|i| rec(&format!("q{}", i), &format!("r{}", i % 13), ((i * 53) % 97) as f64))
            .collect();
        let percentiles = [90.0, 95.0, 99.0, 99.9];
        let thresholds = compute_thresholds(&table, &percentiles).unwrap();
        let specs: Vec<TierSpec> = percentiles.iter().map(|&p| TierSpec::new(p, true)).collect();
        let tiers = build_tiers(&table, &thresholds, &specs).unwrap();
        let meta = RunMetadata::with_counts(300, Some(45_000));
        let profiles =
            build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();

        assert_eq!(profiles.percentiles, percentiles.to_vec());
        let total: u64 = profiles.rows.iter().map(|r| r.hit_count).sum();
        assert_eq!(total, table.len() as u64);

        for row in &profiles.rows {
            for (i, tier) in tiers.iter().enumerate() {
                let expected = tier
                    .records
                    .as_ref()
                    .unwrap()
                    .iter()
                    .any(|r| r.reference_id == row.reference_id);
                assert_eq!(row.in_tier[i], expected, "{} at {}", row.reference_id, tier.percentile);
            }
        }
    }

    #[test]
    fn test_reference_below_all_tiers_still_reported() {
        let table = five_hits();
        let thresholds = compute_thresholds(&table, &[90.0]).unwrap();
        let meta = RunMetadata::with_counts(5, Some(1_000));
        let profiles =
            build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();
        let r2 = profiles.rows.iter().find(|r| r.reference_id == "r2").unwrap();
        assert_eq!(r2.in_tier, vec![false]);
        let r1 = profiles.rows.iter().find(|r| r.reference_id == "r1").unwrap();
        assert_eq!(r1.in_tier, vec![true]);
    }

    #[test]
    fn test_row_order_is_stable() {
        let table = five_hits();
        let thresholds = compute_thresholds(&table, &[50.0]).unwrap();
        let meta = RunMetadata::with_counts(5, Some(1_000));
        let a = build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();
        let b = build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();
        assert_eq!(a, b);
    }
}
