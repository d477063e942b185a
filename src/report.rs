//src/report.rs

use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::{AnalysisConfig, Compression};
use crate::error::Result;
use crate::AccessionResults;

/// Write `text` to `path`, compressed as requested. Parent directories are created.
pub fn write_text<P: AsRef<Path>>(path: P, text: &str, compression: Compression) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = BufWriter::new(File::create(path)?);

    match compression {
        Compression::None => {
            let mut w = file;
            w.write_all(text.as_bytes())?;
            w.flush()?;
        }
        Compression::Gzip => {
            let mut w = GzEncoder::new(file, flate2::Compression::default());
            w.write_all(text.as_bytes())?;
            w.finish()?.flush()?;
        }
        Compression::Zstd => {
            let mut w = zstd::stream::write::Encoder::new(file, 0)?;
            w.write_all(text.as_bytes())?;
            w.finish()?.flush()?;
        }
    }
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// File names of every report produced for one accession.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub output_dir: PathBuf,
    pub accession: String,
    pub compression: Compression,
}

impl ReportPaths {
    pub fn new<P: AsRef<Path>>(output_dir: P, accession: &str, compression: Compression) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            accession: accession.to_string(),
            compression,
        }
    }

    fn file(&self, name: String) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn stats_tsv(&self) -> PathBuf {
        self.file(format!("{}_stats.tsv", self.accession))
    }

    pub fn stats_json(&self) -> PathBuf {
        self.file(format!("{}_stats.json", self.accession))
    }

    pub fn best_hits(&self, percentile: f64) -> PathBuf {
        self.file(format!(
            "{}_best_hits{}.diamondn{}",
            self.accession,
            percentile,
            self.compression.extension()
        ))
    }

    pub fn hits_per_reference(&self) -> PathBuf {
        self.file(format!(
            "{}_hits_per_sseqid.tsv{}",
            self.accession,
            self.compression.extension()
        ))
    }

    pub fn best_hits_per_read(&self) -> PathBuf {
        self.file(format!(
            "{}_best_hits_per_read.diamondn{}",
            self.accession,
            self.compression.extension()
        ))
    }
}

/// Write all reports of an analyzed accession and return the paths written.
pub fn write_accession_reports<P: AsRef<Path>>(
    results: &AccessionResults<'_>,
    output_dir: P,
    config: &AnalysisConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir.as_ref())?;
    let paths = ReportPaths::new(output_dir, &results.summary.sra_accession, config.compression);
    let mut written = Vec::new();

    write_text(paths.stats_tsv(), &results.get_stats_tsv(), Compression::None)?;
    written.push(paths.stats_tsv());
    write_text(paths.stats_json(), &results.get_stats_json()?, Compression::None)?;
    written.push(paths.stats_json());

    for tier in &results.tiers {
        if let Some(text) = results.get_tier_text(tier.percentile) {
            let path = paths.best_hits(tier.percentile);
            write_text(&path, &text, config.compression)?;
            written.push(path);
        }
    }

    write_text(
        paths.hits_per_reference(),
        &results.get_reference_profiles_tsv(),
        config.compression,
    )?;
    written.push(paths.hits_per_reference());

    write_text(
        paths.best_hits_per_read(),
        &results.get_best_read_hits_text(),
        config.compression,
    )?;
    written.push(paths.best_hits_per_read());

    log::info!(
        "Wrote {} report files for {}",
        written.len(),
        results.summary.sra_accession
    );
    Ok(written)
}
