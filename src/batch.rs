use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::error::{Result, StatsError};
use crate::process_accession;
use crate::types::AccessionSummary;

/// One accession to process: its alignments and its metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub accession: String,
    pub alignments: PathBuf,
    pub metadata: PathBuf,
}

/// Result of one accession. A failure here never stops the rest of the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub accession: String,
    pub result: Result<AccessionSummary>,
}

/// Reads a tab-separated manifest: `accession  alignments  metadata_xml`,
/// no header, `#` starts a comment line. Relative paths are resolved
/// against the manifest's directory.
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<BatchEntry>> {
    let path = path.as_ref();
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)?;

    let mut entries = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() < 3 {
            return Err(StatsError::InvalidConfig(format!(
                "manifest row {} needs accession, alignments and metadata columns",
                i + 1
            )));
        }
        entries.push(BatchEntry {
            accession: row[0].trim().to_string(),
            alignments: base.join(row[1].trim()),
            metadata: base.join(row[2].trim()),
        });
    }
    Ok(entries)
}

/// Process every entry in parallel, writing each accession's reports into
/// `output_dir`. Outcomes come back in manifest order; `on_done` is called
/// as each accession finishes, from whichever worker ran it.
pub fn run_batch<P, F>(
    entries: &[BatchEntry],
    config: &AnalysisConfig,
    output_dir: P,
    on_done: F,
) -> Vec<BatchOutcome>
where
    P: AsRef<Path> + Sync,
    F: Fn(&BatchOutcome) + Sync,
{
    let output_dir = output_dir.as_ref();
    entries
        .par_iter()
        .map(|entry| {
            let result = process_accession(
                &entry.accession,
                &entry.alignments,
                &entry.metadata,
                output_dir,
                config,
            );
            if let Err(e) = &result {
                log::warn!("{} failed: {}", entry.accession, e);
            }
            let outcome = BatchOutcome {
                accession: entry.accession.clone(),
                result,
            };
            on_done(&outcome);
            outcome
        })
        .collect()
}

/// Number of failed accessions in a batch.
pub fn failure_count(outcomes: &[BatchOutcome]) -> usize {
    outcomes.iter().filter(|o| o.result.is_err()).count()
}
