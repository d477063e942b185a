use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use dmnd_stats::alignments::read_alignment_table;
use dmnd_stats::config::{AnalysisConfig, Compression, NormalizationBasis, TierSpec};
use dmnd_stats::stats::{
    best_hit_per_read, build_reference_profiles, build_tiers, compute_thresholds,
};
use dmnd_stats::{analyze_accession, process_accession, AlignmentTable, RunMetadata, StatsError};

const HITS: &str = "\
read1\tAtCg00020\t100.0\t1\t150\t1\t150\t1e-80\t280.0\t150\t1062\t150M
read1\tAtCg00030\t92.0\t1\t150\t40\t189\t1e-50\t190.0\t150\t800\t150M
read2\tAtCg00020\t98.0\t1\t150\t500\t351\t1e-70\t260.0\t150\t1062\t150M
read3\tAtMg00010\t85.0\t1\t120\t1\t120\t1e-20\t110.0\t150\t400\t120M
read4\tAtCg00020\t99.0\t1\t150\t900\t1050\t1e-75\t270.0\t150\t1062\t150M
read4\tAtMg00010\t80.0\t1\t100\t10\t109\t1e-10\t90.0\t150\t400\t100M
";

const XML: &str = r#"<EXPERIMENT_PACKAGE_SET><EXPERIMENT_PACKAGE>
<EXPERIMENT><DESIGN><LIBRARY_DESCRIPTOR><LIBRARY_STRATEGY>RNA-Seq</LIBRARY_STRATEGY><LIBRARY_SOURCE>TRANSCRIPTOMIC</LIBRARY_SOURCE></LIBRARY_DESCRIPTOR></DESIGN>
<PLATFORM><ILLUMINA><INSTRUMENT_MODEL>Illumina HiSeq 2500</INSTRUMENT_MODEL></ILLUMINA></PLATFORM></EXPERIMENT>
<STUDY accession="SRP1" center_name="GEO"></STUDY>
<SAMPLE><SAMPLE_ATTRIBUTES><SAMPLE_ATTRIBUTE><TAG>ecotype</TAG><VALUE>Col-0</VALUE></SAMPLE_ATTRIBUTE></SAMPLE_ATTRIBUTES></SAMPLE>
<RUN_SET runs="1" bases="2000000" spots="4000" bytes="1">
<RUN accession="SRR100" published="2019-03-01 10:00:00"></RUN></RUN_SET>
</EXPERIMENT_PACKAGE></EXPERIMENT_PACKAGE_SET>"#;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("SRR100.tsv"), HITS).unwrap();
    fs::write(dir.join("SRR100.xml"), XML).unwrap();
}

fn read_zst(path: &Path) -> String {
    let mut out = String::new();
    zstd::stream::read::Decoder::new(File::open(path).unwrap())
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    out
}

#[test]
fn test_process_accession_writes_every_report() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let out = dir.path().join("out");

    let summary = process_accession(
        "SRR100",
        dir.path().join("SRR100.tsv"),
        dir.path().join("SRR100.xml"),
        &out,
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(summary.num_hits, 6);
    assert_eq!(summary.num_reads, 4000);
    assert_eq!(summary.num_bases, Some(2_000_000));
    assert_eq!(summary.num_references, 3);
    assert_eq!(summary.num_reads_with_hits, 4);
    assert_eq!(summary.year, "2019");
    assert_eq!(summary.ecotype, "Col-0");
    assert_eq!(summary.genotype, "Not available");

    for name in [
        "SRR100_stats.tsv",
        "SRR100_stats.json",
        "SRR100_best_hits90.diamondn.zst",
        "SRR100_best_hits99.9.diamondn.zst",
        "SRR100_hits_per_sseqid.tsv.zst",
        "SRR100_best_hits_per_read.diamondn.zst",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }
    assert!(!out.join("SRR100_best_hits95.diamondn.zst").exists());

    let profile = read_zst(&out.join("SRR100_hits_per_sseqid.tsv.zst"));
    let mut lines = profile.lines();
    assert_eq!(
        lines.next().unwrap(),
        "sseqid\tnum_hits\tnum_hits_normalized\tbest_hit90\tbest_hit95\tbest_hit99\tbest_hit99.9"
    );
    let first: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(first[0], "AtCg00020");
    assert_eq!(first[1], "3");
    assert!((first[2].parse::<f64>().unwrap() - 1.5).abs() < 1e-12);
    assert_eq!(&first[3..], &["1", "1", "1", "1"]);

    let per_read = read_zst(&out.join("SRR100_best_hits_per_read.diamondn.zst"));
    let best_refs: Vec<&str> = per_read
        .lines()
        .map(|l| l.split('\t').nth(1).unwrap())
        .collect();
    assert_eq!(best_refs, vec!["AtCg00020", "AtCg00020", "AtMg00010", "AtCg00020"]);
}

#[test]
fn test_reports_are_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let config = AnalysisConfig {
        compression: Compression::None,
        ..AnalysisConfig::default()
    };
    for run in ["a", "b"] {
        process_accession(
            "SRR100",
            dir.path().join("SRR100.tsv"),
            dir.path().join("SRR100.xml"),
            dir.path().join(run),
            &config,
        )
        .unwrap();
    }
    for name in [
        "SRR100_stats.tsv",
        "SRR100_best_hits99.9.diamondn",
        "SRR100_hits_per_sseqid.tsv",
        "SRR100_best_hits_per_read.diamondn",
    ] {
        assert_eq!(
            fs::read(dir.path().join("a").join(name)).unwrap(),
            fs::read(dir.path().join("b").join(name)).unwrap(),
            "{} differs",
            name
        );
    }
}

#[test]
fn test_malformed_table_fails_without_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::write(dir.path().join("bad.tsv"), "read1\tref\t99\n").unwrap();
    let out = dir.path().join("out");
    let err = process_accession(
        "SRR100",
        dir.path().join("bad.tsv"),
        dir.path().join("SRR100.xml"),
        &out,
        &AnalysisConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StatsError::MalformedRecord { line: 1, .. }));
    assert!(!out.join("SRR100_stats.tsv").exists());
}

#[test]
fn test_three_record_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hits.tsv");
    fs::write(
        &path,
        "q1\tr1\t90\t1\t10\t1\t10\t0.001\t10\t10\t100\t10M\n\
         q1\tr2\t90\t1\t10\t1\t10\t0.001\t20\t10\t100\t10M\n\
         q2\tr1\t90\t1\t10\t1\t10\t0.001\t15\t10\t100\t10M\n",
    )
    .unwrap();
    let table = read_alignment_table(&path).unwrap();

    let thresholds = compute_thresholds(&table, &[50.0]).unwrap();
    assert_eq!(thresholds.get(50.0), Some(15.0));

    let tiers = build_tiers(&table, &thresholds, &[TierSpec::new(50.0, true)]).unwrap();
    let scores: Vec<f64> = tiers[0]
        .records
        .as_ref()
        .unwrap()
        .iter()
        .map(|r| r.bitscore)
        .collect();
    assert_eq!(scores, vec![20.0, 15.0]);

    let best = best_hit_per_read(&table);
    let picked: Vec<(&str, f64)> = best
        .iter()
        .map(|r| (r.query_id.as_str(), r.bitscore))
        .collect();
    assert_eq!(picked, vec![("q1", 20.0), ("q2", 15.0)]);
}

#[test]
fn test_depth_normalization_scenario() {
    let table: AlignmentTable = HITS
        .lines()
        .take(1)
        .cycle()
        .take(4)
        .chain(HITS.lines().nth(3))
        .enumerate()
        .map(|(i, l)| dmnd_stats::alignments::parse_alignment_record(l, i + 1).unwrap())
        .collect();
    let thresholds = compute_thresholds(&table, &[90.0]).unwrap();
    let meta = RunMetadata::with_counts(10, Some(2_000_000));
    let profiles =
        build_reference_profiles(&table, &thresholds, &meta, NormalizationBasis::Bases).unwrap();
    assert_eq!(profiles.rows[0].hit_count, 4);
    assert!((profiles.rows[0].hit_count_normalized - 2.0).abs() < 1e-12);
    assert_eq!(profiles.rows[1].hit_count, 1);
    assert!((profiles.rows[1].hit_count_normalized - 0.5).abs() < 1e-12);

    let zero = RunMetadata::with_counts(10, Some(0));
    assert!(matches!(
        build_reference_profiles(&table, &thresholds, &zero, NormalizationBasis::Bases),
        Err(StatsError::InvalidMetadata { .. })
    ));
}

#[test]
fn test_empty_table_scenario() {
    let table = AlignmentTable::default();
    assert!(matches!(
        compute_thresholds(&table, &[90.0, 99.0]),
        Err(StatsError::EmptyInput { .. })
    ));
    assert!(best_hit_per_read(&table).is_empty());
    let meta = RunMetadata::with_counts(1, Some(1));
    assert!(analyze_accession("X", &table, &meta, &AnalysisConfig::default()).is_err());
}
