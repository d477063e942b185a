// src/stats/coverage.rs

use ahash::AHashMap;
use std::fmt::Write as FmtWrite;
use std::io::BufRead;
use std::path::Path;

use crate::alignments::open_reader;
use crate::error::{Result, StatsError};
use crate::types::AlignmentTable;

/// Reference sequence lengths, in the order they were listed.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLengths {
    entries: Vec<(String, u64)>,
    index: AHashMap<String, usize>,
}

impl ReferenceLengths {
    pub fn push(&mut self, name: &str, length: u64) {
        if self.index.contains_key(name) {
            log::warn!("Duplicate sequence length entry for '{}', keeping the first", name);
            return;
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), length));
    }

    /// Parses a `<name>\t<length>` file. Blank lines are skipped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(open_reader(path)?)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lengths = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 2 {
                return Err(StatsError::malformed(i + 1, "expected <name>\\t<length>"));
            }
            let length: u64 = parts[1].trim().parse().map_err(|_| {
                StatsError::malformed(i + 1, format!("cannot parse length from '{}'", parts[1]))
            })?;
            lengths.push(parts[0].trim(), length);
        }
        Ok(lengths)
    }

    /// Lengths taken from the `slen` column, in first-seen order.
    pub fn from_table(table: &AlignmentTable) -> Self {
        let mut lengths = Self::default();
        for r in table {
            if !lengths.index.contains_key(&r.reference_id) {
                lengths.push(&r.reference_id, r.ref_length);
            }
        }
        lengths
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub sequence_name: String,
    /// Whether any alignment landed on this sequence.
    pub found: bool,
    pub sequence_length: u64,
    pub bin_counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub number_of_bins: usize,
    pub rows: Vec<CoverageRow>,
}

/// Equal-width bins over `[0, length]` for one sequence, as (lower, upper).
fn bin_bounds(length: u64, number_of_bins: usize) -> Vec<(f64, f64)> {
    let len = length as f64;
    let n = number_of_bins as f64;
    (0..number_of_bins)
        .map(|i| (i as f64 * len / n, (i + 1) as f64 * len / n))
        .collect()
}

/// Count alignment ends per positional bin of every listed reference.
///
/// A record counts once in each bin whose closed interval holds its reference
/// start or end, so a position on a shared bin edge counts in both bins.
pub fn coverage_bins(
    table: &AlignmentTable,
    lengths: &ReferenceLengths,
    number_of_bins: usize,
) -> Result<CoverageReport> {
    if number_of_bins == 0 {
        return Err(StatsError::InvalidConfig(
            "number of bins must be at least 1".to_string(),
        ));
    }

    let bounds: Vec<Vec<(f64, f64)>> = lengths
        .entries
        .iter()
        .map(|(_, len)| bin_bounds(*len, number_of_bins))
        .collect();
    let mut rows: Vec<CoverageRow> = lengths
        .entries
        .iter()
        .map(|(name, len)| CoverageRow {
            sequence_name: name.clone(),
            found: false,
            sequence_length: *len,
            bin_counts: vec![0; number_of_bins],
        })
        .collect();

    for record in table {
        let &slot = lengths
            .index
            .get(&record.reference_id)
            .ok_or_else(|| StatsError::UnknownReference(record.reference_id.clone()))?;
        let (start, end) = record.ref_span();
        let (start, end) = (start as f64, end as f64);
        let row = &mut rows[slot];

        for (count, &(lower, upper)) in row.bin_counts.iter_mut().zip(&bounds[slot]) {
            let start_in = start >= lower && start <= upper;
            let end_in = end >= lower && end <= upper;
            if start_in || end_in {
                *count += 1;
                row.found = true;
            }
        }
    }

    Ok(CoverageReport {
        number_of_bins,
        rows,
    })
}

impl CoverageReport {
    /// Column names for the bins: midpoints on a 0..1 scale.
    pub fn bin_labels(&self) -> Vec<String> {
        let n = self.number_of_bins as f64;
        (1..=self.number_of_bins)
            .map(|x| format!("{}", (x as f64 - 0.5) / n))
            .collect()
    }

    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "sequence_name\tfound\tsequence_length\t{}",
            self.bin_labels().join("\t")
        )
        .ok();
        for row in &self.rows {
            let counts: Vec<String> = row.bin_counts.iter().map(|c| c.to_string()).collect();
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                row.sequence_name,
                row.found as u8,
                row.sequence_length,
                counts.join("\t")
            )
            .ok();
        }
        out
    }
}
