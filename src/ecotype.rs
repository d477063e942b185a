//src/ecotype.rs

use ahash::AHashMap;
use std::path::Path;

use crate::error::Result;
use crate::metadata::MetadataDocument;

/// Rendering of unknown values in the ecotype table.
pub const NA: &str = "NA";

pub const ECOTYPE_HEADER: &str =
    "sra_accession\tecotype\tisMix\tisWild\toriginal_ecotype\toriginal_genotype";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcotypeReplacement {
    pub ecotype: String,
    /// `None` when the table says `NA` or anything other than 0/1.
    pub is_mix: Option<bool>,
}

/// Maps ecotype names as written by submitters to a canonical accession name.
#[derive(Debug, Clone, Default)]
pub struct EcotypeLookup {
    replacements: AHashMap<String, EcotypeReplacement>,
}

impl EcotypeLookup {
    /// Reads a comma-separated table with a header line and the columns
    /// `Count,Original,Ecotype,isMix`. `Count` is ignored. A row without
    /// `Ecotype` keeps the original name; a row without `isMix` is not a mix.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut replacements = AHashMap::new();
        for row in reader.records() {
            let row = row?;
            let original = match row.get(1) {
                Some(o) => o.to_string(),
                None => {
                    log::debug!("Skipping ecotype row with fewer than 2 columns: {:?}", row);
                    continue;
                }
            };
            let ecotype = row.get(2).unwrap_or(original.as_str()).to_string();
            let is_mix = match row.get(3) {
                None => Some(false),
                Some("1") => Some(true),
                Some("0") => Some(false),
                Some(_) => None,
            };
            replacements.insert(original, EcotypeReplacement { ecotype, is_mix });
        }
        log::info!("Loaded {} ecotype replacements", replacements.len());
        Ok(Self { replacements })
    }

    pub fn get(&self, original: &str) -> Option<&EcotypeReplacement> {
        self.replacements.get(original)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// Normalized ecotype and wild-type call for one accession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcotypeCall {
    pub sra_accession: String,
    /// Canonical ecotype, or the original when the lookup has no entry.
    pub ecotype: Option<String>,
    /// `None` when the ecotype was not in the lookup.
    pub is_mix: Option<bool>,
    /// Genotype mentions "wild"; `None` without a genotype attribute.
    pub is_wild: Option<bool>,
    pub original_ecotype: Option<String>,
    pub original_genotype: Option<String>,
}

pub fn classify_ecotype(
    sra_accession: &str,
    doc: &MetadataDocument,
    lookup: &EcotypeLookup,
) -> EcotypeCall {
    let original_ecotype = doc.sample_attribute("ecotype");
    let original_genotype = doc.sample_attribute("genotype");

    let replacement = original_ecotype.as_deref().and_then(|e| lookup.get(e));
    let (ecotype, is_mix) = match replacement {
        Some(rep) => (Some(rep.ecotype.clone()), rep.is_mix),
        None => (original_ecotype.clone(), None),
    };
    let is_wild = original_genotype
        .as_deref()
        .map(|g| g.to_lowercase().contains("wild"));

    EcotypeCall {
        sra_accession: sra_accession.to_string(),
        ecotype,
        is_mix,
        is_wild,
        original_ecotype,
        original_genotype,
    }
}

fn flag(v: Option<bool>) -> &'static str {
    match v {
        Some(true) => "1",
        Some(false) => "0",
        None => NA,
    }
}

impl EcotypeCall {
    /// One tab-separated row matching [`ECOTYPE_HEADER`].
    pub fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.sra_accession,
            self.ecotype.as_deref().unwrap_or(NA),
            flag(self.is_mix),
            flag(self.is_wild),
            self.original_ecotype.as_deref().unwrap_or(NA),
            self.original_genotype.as_deref().unwrap_or(NA),
        )
    }
}
