//src/config.rs

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, StatsError};

/// One best-hit tier: the percentile cut-off and whether its full record set
/// is written out, or only its count and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub percentile: f64,
    #[serde(default)]
    pub persist_full_table: bool,
}

impl TierSpec {
    pub fn new(percentile: f64, persist_full_table: bool) -> Self {
        Self {
            percentile,
            persist_full_table,
        }
    }
}

/// Which depth measure divides the per-reference hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationBasis {
    /// hits per million sequenced bases
    #[default]
    Bases,
    /// hits per million sequenced reads
    Reads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    #[default]
    Zstd,
}

impl Compression {
    /// File name suffix, including the leading dot; empty for plain text.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Zstd => ".zst",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tiers: Vec<TierSpec>,
    pub normalization: NormalizationBasis,
    pub compression: Compression,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierSpec::new(90.0, true),
                TierSpec::new(95.0, false),
                TierSpec::new(99.0, false),
                TierSpec::new(99.9, true),
            ],
            normalization: NormalizationBasis::Bases,
            compression: Compression::Zstd,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON config; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: AnalysisConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Percentiles must be non-empty, within (0, 100] and strictly ascending.
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(StatsError::InvalidConfig(
                "at least one percentile tier is required".to_string(),
            ));
        }
        validate_percentiles(&self.percentiles())
    }

    pub fn percentiles(&self) -> Vec<f64> {
        self.tiers.iter().map(|t| t.percentile).collect()
    }

    /// Replace the tier list, persisting exactly the listed percentiles.
    /// With no explicit list the loosest and strictest tiers are persisted.
    pub fn set_tiers(&mut self, percentiles: &[f64], persist: Option<&[f64]>) {
        let last = percentiles.len().saturating_sub(1);
        self.tiers = percentiles
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let keep = match persist {
                    Some(list) => list.contains(&p),
                    None => i == 0 || i == last,
                };
                TierSpec::new(p, keep)
            })
            .collect();
    }
}

pub fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    let mut previous: Option<f64> = None;
    for &p in percentiles {
        if !p.is_finite() || p <= 0.0 || p > 100.0 {
            return Err(StatsError::invalid_percentile(p, "must lie in (0, 100]"));
        }
        if let Some(prev) = previous {
            if p <= prev {
                return Err(StatsError::invalid_percentile(
                    p,
                    format!("percentiles must be strictly ascending, {} follows {}", p, prev),
                ));
            }
        }
        previous = Some(p);
    }
    Ok(())
}

/// Parse a comma-separated percentile list such as `90,95,99,99.9`.
pub fn parse_percentile_list(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| StatsError::InvalidConfig(format!("'{}' is not a percentile", t)))
        })
        .collect()
}
