// src/stats/percentile.rs

use crate::error::{Result, StatsError};
use crate::types::{AlignmentTable, ThresholdSet};

/// Bitscore cut-off at each requested percentile.
///
/// Uses linear interpolation between closest ranks: for `n` sorted scores the
/// percentile `p` sits at rank `p / 100 * (n - 1)`. This is the default
/// definition of numpy's `percentile`, and the interpolation step follows the
/// same rounding so results match it bit for bit.
pub fn compute_thresholds(table: &AlignmentTable, percentiles: &[f64]) -> Result<ThresholdSet> {
    if table.is_empty() {
        return Err(StatsError::empty_input("percentile thresholds"));
    }
    check_percentiles(percentiles)?;

    let mut scores: Vec<f64> = table.iter().map(|r| r.bitscore).collect();
    scores.sort_unstable_by(|a, b| a.total_cmp(b));

    let entries = percentiles
        .iter()
        .map(|&p| (p, percentile_of_sorted(&scores, p)))
        .collect();
    let thresholds = ThresholdSet::from_entries(entries);

    for (p, t) in thresholds.iter() {
        log::debug!("bitscore threshold at percentile {}: {}", p, t);
    }
    Ok(thresholds)
}

fn check_percentiles(percentiles: &[f64]) -> Result<()> {
    for (i, &p) in percentiles.iter().enumerate() {
        if !(0.0..=100.0).contains(&p) {
            return Err(StatsError::invalid_percentile(p, "must lie in [0, 100]"));
        }
        if i > 0 && p <= percentiles[i - 1] {
            return Err(StatsError::invalid_percentile(p, "percentiles must be ascending"));
        }
    }
    Ok(())
}

/// Percentile of an ascending, non-empty slice.
pub(crate) fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = percentile / 100.0 * (n - 1) as f64;
    let lower = rank.floor();
    let lo = (lower as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    lerp(sorted[lo], sorted[hi], rank - lower)
}

/// a + (b - a) * t, evaluated from the nearer end to limit rounding error.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}
