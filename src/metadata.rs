//src/metadata.rs

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Result, StatsError};
use crate::types::{RunMetadata, NOT_AVAILABLE};

/// Scalar fields pulled from an SRA experiment-package XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `RUN_SET@spots`, falling back to `RUN@total_spots`
    ReadCount,
    /// `RUN_SET@bases`, falling back to `RUN@total_bases`
    BaseCount,
    InstrumentModel,
    /// `RUN@published`, e.g. `2022-07-14 22:42:20`
    Published,
    /// `STUDY@center_name`
    CenterName,
    LibraryStrategy,
    LibrarySource,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::ReadCount => "read_count",
            Field::BaseCount => "base_count",
            Field::InstrumentModel => "instrument",
            Field::Published => "published",
            Field::CenterName => "lab",
            Field::LibraryStrategy => "library_strategy",
            Field::LibrarySource => "library_source",
        }
    }
}

struct Patterns {
    spots: Regex,
    total_spots: Regex,
    bases: Regex,
    total_bases: Regex,
    instrument: Regex,
    published: Regex,
    center_name: Regex,
    library_strategy: Regex,
    library_source: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("metadata pattern is a valid regex")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        spots: compile(r#"<RUN_SET\b[^>]*?\bspots="([^"]*)""#),
        total_spots: compile(r#"<RUN\b[^>]*?\btotal_spots="([^"]*)""#),
        bases: compile(r#"<RUN_SET\b[^>]*?\bbases="([^"]*)""#),
        total_bases: compile(r#"<RUN\b[^>]*?\btotal_bases="([^"]*)""#),
        instrument: compile(r"(?s)<INSTRUMENT_MODEL>\s*(.*?)\s*</INSTRUMENT_MODEL>"),
        published: compile(r#"<RUN\b[^>]*?\bpublished="([^"]*)""#),
        center_name: compile(r#"<STUDY\b[^>]*?\bcenter_name="([^"]*)""#),
        library_strategy: compile(r"(?s)<LIBRARY_STRATEGY>\s*(.*?)\s*</LIBRARY_STRATEGY>"),
        library_source: compile(r"(?s)<LIBRARY_SOURCE>\s*(.*?)\s*</LIBRARY_SOURCE>"),
    })
}

/// An experiment-description document, kept as text and queried by field.
#[derive(Debug, Clone)]
pub struct MetadataDocument {
    text: String,
}

impl MetadataDocument {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            text: fs::read_to_string(path)?,
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn capture(&self, re: &Regex) -> Option<String> {
        re.captures(&self.text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Raw value of a field, or `None` when the document does not carry it.
    pub fn field(&self, field: Field) -> Option<String> {
        let p = patterns();
        match field {
            Field::ReadCount => self.capture(&p.spots).or_else(|| self.capture(&p.total_spots)),
            Field::BaseCount => self.capture(&p.bases).or_else(|| self.capture(&p.total_bases)),
            Field::InstrumentModel => self.capture(&p.instrument),
            Field::Published => self.capture(&p.published),
            Field::CenterName => self.capture(&p.center_name),
            Field::LibraryStrategy => self.capture(&p.library_strategy),
            Field::LibrarySource => self.capture(&p.library_source),
        }
    }

    /// Value of an optional field, or the "Not available" sentinel.
    pub fn field_or_default(&self, field: Field) -> String {
        self.field(field)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// A mandatory positive count; missing or non-numeric values are errors.
    pub fn required_count(&self, field: Field) -> Result<u64> {
        let raw = self
            .field(field)
            .ok_or_else(|| StatsError::invalid_metadata(field.name(), "missing from metadata"))?;
        parse_count(field, &raw)
    }

    /// An optional count: absent gives `None`, present but non-numeric is an error.
    pub fn optional_count(&self, field: Field) -> Result<Option<u64>> {
        self.field(field)
            .map(|raw| parse_count(field, &raw))
            .transpose()
    }

    /// Value of the first `SAMPLE_ATTRIBUTE` whose tag contains `tag`
    /// (case-insensitive), so `Ecotype_source` matches `ecotype`.
    pub fn sample_attribute(&self, tag: &str) -> Option<String> {
        self.attribute_value(&format!(r"(?i)[^<]*?{}[^<]*?", regex::escape(tag)))
    }

    /// Value of the `SAMPLE_ATTRIBUTE` whose tag is exactly `tag`.
    pub fn sample_attribute_exact(&self, tag: &str) -> Option<String> {
        self.attribute_value(&regex::escape(tag))
    }

    fn attribute_value(&self, tag_pattern: &str) -> Option<String> {
        let pattern = format!(
            r"(?s)<SAMPLE_ATTRIBUTE>\s*<TAG>\s*(?:{})\s*</TAG>\s*<VALUE>\s*(.*?)\s*</VALUE>",
            tag_pattern
        );
        let re = Regex::new(&pattern).ok()?;
        self.capture(&re)
    }

    /// Publication year: the part of `RUN@published` before the first `-`.
    pub fn year(&self) -> Option<String> {
        self.field(Field::Published)
            .and_then(|p| p.split('-').next().map(str::to_string))
            .filter(|y| !y.is_empty())
    }

    /// Flat run metadata. Only the read count is mandatory here; whether a
    /// base count is needed depends on how reference profiles are normalized.
    pub fn run_metadata(&self) -> Result<RunMetadata> {
        let read_count = self.required_count(Field::ReadCount)?;
        let base_count = self.optional_count(Field::BaseCount)?;
        let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Ok(RunMetadata {
            read_count,
            base_count,
            instrument: self.field_or_default(Field::InstrumentModel),
            year: or_na(self.year()),
            lab: self.field_or_default(Field::CenterName),
            ecotype: or_na(self.sample_attribute_exact("ecotype")),
            genotype: or_na(self.sample_attribute_exact("genotype")),
            library_strategy: self.field_or_default(Field::LibraryStrategy),
            library_source: self.field_or_default(Field::LibrarySource),
        })
    }
}

fn parse_count(field: Field, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| StatsError::invalid_metadata(field.name(), format!("'{}' is not an integer", raw)))
}

/// Accession id from a metadata file name, e.g. `SRR123.xml` -> `SRR123`.
pub fn accession_from_path<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}
