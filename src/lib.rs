// src/lib.rs
pub mod alignments;
pub mod batch;
pub mod config;
pub mod ecotype;
pub mod error;
pub mod metadata;
pub mod report;
pub mod stats;
pub mod types;

use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::alignments::read_alignment_table;
use crate::config::AnalysisConfig;
use crate::metadata::MetadataDocument;
use crate::report::write_accession_reports;
use crate::stats::tiers::summarize_tiers;
use crate::stats::{best_hit_per_read, build_reference_profiles, build_tiers, compute_thresholds};

pub use crate::error::{Result, StatsError};
pub use crate::types::{
    AccessionSummary, AlignmentRecord, AlignmentTable, BestHitTier, ReferenceProfile,
    ReferenceProfiles, RunMetadata, ThresholdSet, TierSummary,
};

/// Everything computed for one accession. Record lists borrow from the
/// alignment table; text for each report is generated on demand.
pub struct AccessionResults<'a> {
    pub summary: AccessionSummary,
    pub thresholds: ThresholdSet,
    /// One tier per configured percentile, loosest first.
    pub tiers: Vec<BestHitTier<'a>>,
    pub reference_profiles: ReferenceProfiles,
    /// Best record per read, sorted by read id.
    pub best_read_hits: Vec<&'a AlignmentRecord>,
}

fn write_records(out: &mut String, records: &[&AlignmentRecord]) {
    for r in records {
        writeln!(out, "{}", r.to_tsv_line()).unwrap();
    }
}

impl<'a> AccessionResults<'a> {
    /// Accession summary as a header line plus one row.
    pub fn get_stats_tsv(&self) -> String {
        let s = &self.summary;
        let mut header = String::from(
            "sra_accession\tnum_reads\tnum_bases\tnum_hits\tnum_sseqids\tnum_reads_with_hits\t\
             sequencer\tyear\tlab\tecotype\tgenotype\tlibrary_strategy\tlibrary_source",
        );
        let mut row = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.sra_accession,
            s.num_reads,
            s.num_bases
                .map(|b| b.to_string())
                .unwrap_or_else(|| "NA".to_string()),
            s.num_hits,
            s.num_references,
            s.num_reads_with_hits,
            s.sequencer,
            s.year,
            s.lab,
            s.ecotype,
            s.genotype,
            s.library_strategy,
            s.library_source
        );
        for t in &s.tiers {
            write!(header, "\tthreshold{}\tnum_best_hits{}", t.percentile, t.percentile).unwrap();
            write!(row, "\t{}\t{}", t.threshold, t.count).unwrap();
        }
        format!("{}\n{}\n", header, row)
    }

    pub fn get_stats_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary)?)
    }

    /// Records of a persisted tier, best first. `None` for tiers that were
    /// only counted, or for unknown percentiles.
    pub fn get_tier_text(&self, percentile: f64) -> Option<String> {
        let tier = self.tiers.iter().find(|t| t.percentile == percentile)?;
        let records = tier.records.as_ref()?;
        let mut output = String::new();
        write_records(&mut output, records);
        Some(output)
    }

    /// Per-reference hit counts, normalized rate and one 0/1 column per tier.
    pub fn get_reference_profiles_tsv(&self) -> String {
        let mut output = String::from("sseqid\tnum_hits\tnum_hits_normalized");
        for p in &self.reference_profiles.percentiles {
            write!(output, "\tbest_hit{}", p).unwrap();
        }
        output.push('\n');

        for row in &self.reference_profiles.rows {
            write!(
                output,
                "{}\t{}\t{}",
                row.reference_id, row.hit_count, row.hit_count_normalized
            )
            .unwrap();
            for &flag in &row.in_tier {
                write!(output, "\t{}", flag as u8).unwrap();
            }
            output.push('\n');
        }
        output
    }

    pub fn get_best_read_hits_text(&self) -> String {
        let mut output = String::new();
        write_records(&mut output, &self.best_read_hits);
        output
    }
}

/// Run the statistics engine over one accession's table.
pub fn analyze_accession<'a>(
    accession: &str,
    table: &'a AlignmentTable,
    metadata: &RunMetadata,
    config: &AnalysisConfig,
) -> Result<AccessionResults<'a>> {
    config.validate()?;

    let thresholds = compute_thresholds(table, &config.percentiles())?;
    let tiers = build_tiers(table, &thresholds, &config.tiers)?;
    let reference_profiles =
        build_reference_profiles(table, &thresholds, metadata, config.normalization)?;
    let best_read_hits = best_hit_per_read(table);

    let summary = AccessionSummary {
        sra_accession: accession.to_string(),
        num_reads: metadata.read_count,
        num_bases: metadata.base_count,
        num_hits: table.len(),
        num_references: reference_profiles.rows.len(),
        num_reads_with_hits: best_read_hits.len(),
        sequencer: metadata.instrument.clone(),
        year: metadata.year.clone(),
        lab: metadata.lab.clone(),
        ecotype: metadata.ecotype.clone(),
        genotype: metadata.genotype.clone(),
        library_strategy: metadata.library_strategy.clone(),
        library_source: metadata.library_source.clone(),
        tiers: summarize_tiers(&tiers),
    };

    Ok(AccessionResults {
        summary,
        thresholds,
        tiers,
        reference_profiles,
        best_read_hits,
    })
}

/// Load one accession's alignments and metadata, analyze them and write every
/// report into `output_dir`.
pub fn process_accession<A, M, O>(
    accession: &str,
    alignments_path: A,
    metadata_path: M,
    output_dir: O,
    config: &AnalysisConfig,
) -> Result<AccessionSummary>
where
    A: AsRef<Path>,
    M: AsRef<Path>,
    O: AsRef<Path>,
{
    let metadata = MetadataDocument::from_path(metadata_path)?.run_metadata()?;
    log::info!(
        "{}: {} reads, {} bases, sequencer {}",
        accession,
        metadata.read_count,
        metadata
            .base_count
            .map(|b| b.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        metadata.instrument
    );

    let table = read_alignment_table(alignments_path)?;
    let results = analyze_accession(accession, &table, &metadata, config)?;
    write_accession_reports(&results, output_dir, config)?;
    Ok(results.summary)
}
