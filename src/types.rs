//src/types.rs

use serde::{Deserialize, Serialize};

/// Sentinel used for optional metadata fields the document does not carry.
pub const NOT_AVAILABLE: &str = "Not available";

/// One row of DIAMOND tabular output, in column order:
/// ```text
/// qseqid sseqid pident qstart qend sstart send evalue bitscore qlen slen cigar
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub query_id: String,
    pub reference_id: String,
    pub percent_identity: f64,
    pub query_start: u64,
    pub query_end: u64,
    pub ref_start: u64,
    pub ref_end: u64,
    pub e_value: f64,
    /// Primary ranking key.
    pub bitscore: f64,
    pub query_length: u64,
    pub ref_length: u64,
    pub alignment_cigar: String,
}

impl AlignmentRecord {
    /// The record in the same 12-column layout it was read from.
    pub fn to_tsv_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_id,
            self.reference_id,
            self.percent_identity,
            self.query_start,
            self.query_end,
            self.ref_start,
            self.ref_end,
            format_evalue(self.e_value),
            self.bitscore,
            self.query_length,
            self.ref_length,
            self.alignment_cigar
        )
    }

    /// Reference coordinates with start <= end, whatever the strand.
    pub fn ref_span(&self) -> (u64, u64) {
        if self.ref_start <= self.ref_end {
            (self.ref_start, self.ref_end)
        } else {
            (self.ref_end, self.ref_start)
        }
    }
}

/// Small e-values in scientific notation, the way search tools print them.
/// Both forms are the shortest text that parses back to the same `f64`.
fn format_evalue(v: f64) -> String {
    if v != 0.0 && v < 1e-3 {
        format!("{:e}", v)
    } else {
        format!("{}", v)
    }
}

/// All alignment records of one accession, in input order.
///
/// Built once by the loader and never mutated afterwards; derived results
/// borrow from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentTable {
    records: Vec<AlignmentRecord>,
}

impl AlignmentTable {
    pub fn new(records: Vec<AlignmentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlignmentRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a AlignmentTable {
    type Item = &'a AlignmentRecord;
    type IntoIter = std::slice::Iter<'a, AlignmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<AlignmentRecord> for AlignmentTable {
    fn from_iter<I: IntoIterator<Item = AlignmentRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Scalar run metadata for one accession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub read_count: u64,
    /// Sequenced bases; only needed when normalizing by depth in bases.
    pub base_count: Option<u64>,
    pub instrument: String,
    pub year: String,
    pub lab: String,
    pub ecotype: String,
    pub genotype: String,
    pub library_strategy: String,
    pub library_source: String,
}

impl RunMetadata {
    /// Metadata with only the counts known, every string field set to the sentinel.
    pub fn with_counts(read_count: u64, base_count: Option<u64>) -> Self {
        Self {
            read_count,
            base_count,
            instrument: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            lab: NOT_AVAILABLE.to_string(),
            ecotype: NOT_AVAILABLE.to_string(),
            genotype: NOT_AVAILABLE.to_string(),
            library_strategy: NOT_AVAILABLE.to_string(),
            library_source: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Percentile -> bitscore cut-off, ascending by percentile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    entries: Vec<(f64, f64)>,
}

impl ThresholdSet {
    pub(crate) fn from_entries(entries: Vec<(f64, f64)>) -> Self {
        Self { entries }
    }

    /// Threshold for a configured percentile. Keys are compared exactly, so
    /// callers must pass the same value they configured.
    pub fn get(&self, percentile: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|(p, _)| *p == percentile)
            .map(|&(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn percentiles(&self) -> Vec<f64> {
        self.entries.iter().map(|&(p, _)| p).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records at or above one percentile's threshold.
#[derive(Debug, Clone)]
pub struct BestHitTier<'a> {
    pub percentile: f64,
    pub threshold: f64,
    /// Number of records with `bitscore >= threshold`; always set.
    pub count: usize,
    /// Records sorted by descending bitscore, stable on input order.
    /// Only materialized for tiers persisted in full.
    pub records: Option<Vec<&'a AlignmentRecord>>,
}

/// Per-reference hit profile row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceProfile {
    pub reference_id: String,
    pub hit_count: u64,
    pub hit_count_normalized: f64,
    /// One flag per percentile, in the same order as the threshold set.
    pub in_tier: Vec<bool>,
}

/// All reference rows plus the percentiles their flags refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceProfiles {
    pub percentiles: Vec<f64>,
    /// First-seen order of `reference_id` in the alignment table.
    pub rows: Vec<ReferenceProfile>,
}

/// Threshold and size of one tier, as reported in the accession summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub percentile: f64,
    pub threshold: f64,
    pub count: usize,
}

/// One-row statistics for an accession.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessionSummary {
    pub sra_accession: String,
    pub num_reads: u64,
    pub num_bases: Option<u64>,
    pub num_hits: usize,
    pub num_references: usize,
    pub num_reads_with_hits: usize,
    pub sequencer: String,
    pub year: String,
    pub lab: String,
    pub ecotype: String,
    pub genotype: String,
    pub library_strategy: String,
    pub library_source: String,
    pub tiers: Vec<TierSummary>,
}
