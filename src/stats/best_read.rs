// src/stats/best_read.rs

use ahash::AHashMap;

use crate::error::{Result, StatsError};
use crate::types::{AlignmentRecord, AlignmentTable};

/// Highest-bitscore record for every distinct `query_id`, sorted by `query_id`.
///
/// When several records of a read share the top score, the first one in
/// input order is kept. An empty table gives an empty result.
pub fn best_hit_per_read(table: &AlignmentTable) -> Vec<&AlignmentRecord> {
    let mut best: AHashMap<&str, &AlignmentRecord> = AHashMap::with_capacity(table.len() / 2);

    for record in table {
        best.entry(record.query_id.as_str())
            .and_modify(|current| {
                if record.bitscore > current.bitscore {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let mut hits: Vec<&AlignmentRecord> = best.into_values().collect();
    hits.sort_unstable_by(|a, b| a.query_id.cmp(&b.query_id));

    log::info!(
        "Reduced {} alignments to {} best hits per read",
        table.len(),
        hits.len()
    );
    hits
}

/// Same as [`best_hit_per_read`], for callers that need at least one row.
pub fn best_hit_per_read_nonempty(table: &AlignmentTable) -> Result<Vec<&AlignmentRecord>> {
    if table.is_empty() {
        return Err(StatsError::empty_input("best hit per read"));
    }
    Ok(best_hit_per_read(table))
}
