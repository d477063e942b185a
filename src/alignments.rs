use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;

use crate::error::{Result, StatsError};
use crate::types::{AlignmentRecord, AlignmentTable};

/// Number of columns in DIAMOND `--outfmt 6 qseqid sseqid pident qstart qend
/// sstart send evalue bitscore qlen slen cigar`.
pub const ALIGNMENT_COLUMNS: usize = 12;

/// Open a text input, decompressing `.gz` and `.zst`/`.zstd` files on the fly.
/// A path of `-` reads stdin.
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let f = File::open(path)?;
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let reader: Box<dyn Read> = match ext.as_str() {
        "gz" => Box::new(MultiGzDecoder::new(f)),
        "zst" | "zstd" => Box::new(zstd::stream::read::Decoder::new(f)?),
        _ => Box::new(f),
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Load a whole alignment table from a file (plain, gzip or zstd) or `-`.
pub fn read_alignment_table<P: AsRef<Path>>(path: P) -> Result<AlignmentTable> {
    let path = path.as_ref();
    let reader = open_reader(path)?;
    let table = parse_alignment_table(reader)?;
    log::info!(
        "Loaded {} alignment records from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Parse tab-separated alignment records. Blank lines are skipped; any other
/// line that is not a well-formed 12-field record rejects the whole table.
pub fn parse_alignment_table<R: BufRead>(mut reader: R) -> Result<AlignmentTable> {
    let mut records = Vec::new();
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break; // EOF
        }
        line_no += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        records.push(parse_alignment_record(trimmed, line_no)?);
    }

    Ok(AlignmentTable::new(records))
}

/// Parse one record; `line_no` is only used for error reporting.
pub fn parse_alignment_record(line: &str, line_no: usize) -> Result<AlignmentRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != ALIGNMENT_COLUMNS {
        return Err(StatsError::malformed(
            line_no,
            format!(
                "expected {} tab-separated fields, found {}",
                ALIGNMENT_COLUMNS,
                fields.len()
            ),
        ));
    }

    let text = |idx: usize, name: &str| -> Result<String> {
        let v = fields[idx].trim();
        if v.is_empty() {
            Err(StatsError::malformed(line_no, format!("empty {}", name)))
        } else {
            Ok(v.to_string())
        }
    };

    let record = AlignmentRecord {
        query_id: text(0, "qseqid")?,
        reference_id: text(1, "sseqid")?,
        percent_identity: parse_field(fields[2], "pident", line_no)?,
        query_start: parse_field(fields[3], "qstart", line_no)?,
        query_end: parse_field(fields[4], "qend", line_no)?,
        ref_start: parse_field(fields[5], "sstart", line_no)?,
        ref_end: parse_field(fields[6], "send", line_no)?,
        e_value: parse_field(fields[7], "evalue", line_no)?,
        bitscore: parse_field(fields[8], "bitscore", line_no)?,
        query_length: parse_field(fields[9], "qlen", line_no)?,
        ref_length: parse_field(fields[10], "slen", line_no)?,
        alignment_cigar: fields[11].trim().to_string(),
    };

    if !record.bitscore.is_finite() {
        return Err(StatsError::malformed(line_no, "bitscore is not finite"));
    }
    if !(0.0..=100.0).contains(&record.percent_identity) {
        return Err(StatsError::malformed(
            line_no,
            format!("pident {} outside [0, 100]", record.percent_identity),
        ));
    }
    if !(record.e_value >= 0.0) {
        return Err(StatsError::malformed(
            line_no,
            format!("evalue {} is negative", record.e_value),
        ));
    }

    Ok(record)
}

fn parse_field<T: FromStr>(raw: &str, name: &str, line_no: usize) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        StatsError::malformed(line_no, format!("cannot parse {} from '{}'", name, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const LINE: &str = "read1\tAtCg00020\t99.3\t1\t150\t2001\t1852\t3.2e-45\t280.5\t150\t1062\t150M";

    #[test]
    fn test_parse_record_fields() {
        let r = parse_alignment_record(LINE, 1).unwrap();
        assert_eq!(r.query_id, "read1");
        assert_eq!(r.reference_id, "AtCg00020");
        assert_eq!(r.percent_identity, 99.3);
        assert_eq!((r.ref_start, r.ref_end), (2001, 1852));
        assert_eq!(r.e_value, 3.2e-45);
        assert_eq!(r.bitscore, 280.5);
        assert_eq!(r.ref_length, 1062);
        assert_eq!(r.alignment_cigar, "150M");
    }

    #[test]
    fn test_table_skips_blank_lines_and_keeps_order() {
        let input = format!("{}\n\n{}\r\n", LINE, LINE.replace("read1", "read2"));
        let table = parse_alignment_table(Cursor::new(input)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].query_id, "read2");
    }

    #[test]
    fn test_wrong_field_count_is_rejected_with_line_number() {
        let input = format!("{}\nread2\tref\t99.0\n", LINE);
        match parse_alignment_table(Cursor::new(input)) {
            Err(StatsError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_bitscore_is_rejected() {
        let bad = LINE.replace("280.5", "high");
        assert!(matches!(
            parse_alignment_record(&bad, 3),
            Err(StatsError::MalformedRecord { line: 3, .. })
        ));
        let nan = LINE.replace("280.5", "NaN");
        assert!(parse_alignment_record(&nan, 1).is_err());
    }

    #[test]
    fn test_identity_out_of_range_is_rejected() {
        let bad = LINE.replace("99.3", "120.0");
        assert!(parse_alignment_record(&bad, 1).is_err());
    }

    #[test]
    fn test_reads_gzip_and_zstd_files() {
        let dir = tempfile::tempdir().unwrap();

        let gz_path = dir.path().join("hits.diamondn.gz");
        let mut gz = flate2::write::GzEncoder::new(
            File::create(&gz_path).unwrap(),
            flate2::Compression::default(),
        );
        writeln!(gz, "{}", LINE).unwrap();
        gz.finish().unwrap();

        let zst_path = dir.path().join("hits.diamondn.zst");
        let mut zst = zstd::stream::write::Encoder::new(File::create(&zst_path).unwrap(), 0)
            .unwrap()
            .auto_finish();
        writeln!(zst, "{}", LINE).unwrap();
        drop(zst);

        assert_eq!(read_alignment_table(&gz_path).unwrap().len(), 1);
        assert_eq!(read_alignment_table(&zst_path).unwrap().len(), 1);
    }
}
