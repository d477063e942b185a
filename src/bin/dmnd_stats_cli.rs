use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dmnd_stats::alignments::read_alignment_table;
use dmnd_stats::batch::{failure_count, read_manifest, run_batch};
use dmnd_stats::config::{parse_percentile_list, AnalysisConfig, Compression, NormalizationBasis};
use dmnd_stats::ecotype::{classify_ecotype, EcotypeLookup, ECOTYPE_HEADER};
use dmnd_stats::metadata::{accession_from_path, MetadataDocument};
use dmnd_stats::report::{write_text, ReportPaths};
use dmnd_stats::stats::{best_hit_per_read, coverage_bins, ReferenceLengths};
use dmnd_stats::{process_accession, Result, StatsError};

#[derive(Parser)]
#[command(name = "dmnd-stats")]
#[command(about = "Summarize DIAMOND alignment results per SRA accession", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Statistics, best-hit tiers, per-reference profile and best hit per read for one accession
    Analyze {
        /// DIAMOND tabular output (plain, .gz or .zst; - for stdin)
        #[arg(value_name = "ALIGNMENTS")]
        alignments: PathBuf,

        /// Output folder, created if missing
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// SRA accession, used to name the output files
        #[arg(value_name = "ACCESSION")]
        accession: String,

        /// SRA experiment-package XML
        #[arg(value_name = "SRA_XML")]
        metadata: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Keep only the highest-bitscore alignment of every read
    BestHitsPerRead {
        #[arg(value_name = "ALIGNMENTS")]
        alignments: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        #[arg(value_name = "ACCESSION")]
        accession: String,

        #[arg(long, value_enum, default_value = "zstd")]
        compression: CompressionArg,
    },

    /// Normalized ecotype, mix and wild-type flags from SRA metadata
    Ecotype {
        /// SRA experiment-package XML; the accession is its file stem
        #[arg(value_name = "SRA_XML", required_unless_present = "header")]
        metadata: Option<PathBuf>,

        /// Ecotype replacement table (Count,Original,Ecotype,isMix)
        #[arg(value_name = "REPLACEMENTS", required_unless_present = "header")]
        replacements: Option<PathBuf>,

        /// Only print the header line
        #[arg(long)]
        header: bool,
    },

    /// Count alignment ends in equal-width bins along each reference
    Coverage {
        /// Alignments (- for stdin)
        #[arg(value_name = "ALIGNMENTS")]
        alignments: PathBuf,

        /// Output prefix; writes PREFIX.tsv, or stdout for -
        #[arg(value_name = "OUTPUT_PREFIX")]
        output_prefix: String,

        /// Number of bins per reference
        #[arg(short = 'n', long, value_name = "INT", default_value = "10")]
        bins: usize,

        /// Tab-separated name/length file; without it lengths come from the slen column
        #[arg(short = 'l', long, value_name = "FILE")]
        lengths: Option<PathBuf>,
    },

    /// Analyze many accessions in parallel from a manifest
    Batch {
        /// TSV: accession, alignments, SRA XML
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Worker threads (0 = all cores)
        #[arg(short = 't', long, value_name = "INT", default_value = "0")]
        threads: usize,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// JSON config file; the flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comma-separated ascending percentiles, e.g. 90,95,99,99.9
    #[arg(long, value_name = "LIST")]
    percentiles: Option<String>,

    /// Percentiles whose full best-hit tables are written (default: loosest and strictest)
    #[arg(long, value_name = "LIST")]
    persist: Option<String>,

    /// Depth used for normalized hit counts
    #[arg(long, value_enum)]
    normalize: Option<NormalizeArg>,

    #[arg(long, value_enum)]
    compression: Option<CompressionArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum NormalizeArg {
    Bases,
    Reads,
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Gzip,
    Zstd,
}

impl From<CompressionArg> for Compression {
    fn from(c: CompressionArg) -> Self {
        match c {
            CompressionArg::None => Compression::None,
            CompressionArg::Gzip => Compression::Gzip,
            CompressionArg::Zstd => Compression::Zstd,
        }
    }
}

impl AnalysisArgs {
    fn to_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        let persist = self.persist.as_deref().map(parse_percentile_list).transpose()?;
        match (&self.percentiles, persist) {
            (Some(list), persist) => {
                config.set_tiers(&parse_percentile_list(list)?, persist.as_deref());
            }
            (None, Some(persist)) => {
                let percentiles = config.percentiles();
                config.set_tiers(&percentiles, Some(persist.as_slice()));
            }
            (None, None) => {}
        }

        if let Some(n) = self.normalize {
            config.normalization = match n {
                NormalizeArg::Bases => NormalizationBasis::Bases,
                NormalizeArg::Reads => NormalizationBasis::Reads,
            };
        }
        if let Some(c) = self.compression {
            config.compression = c.into();
        }
        config.validate()?;
        Ok(config)
    }
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{}}} {{msg}}", color))
            .expect("Invalid spinner template"),
    );
    spinner.set_message(msg.to_string());
    spinner
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Analyze {
            alignments,
            output_dir,
            accession,
            metadata,
            analysis,
        } => {
            let config = analysis.to_config()?;
            let sp = spinner("green", &format!("Analyzing {}...", accession));
            let summary = process_accession(&accession, &alignments, &metadata, &output_dir, &config)?;
            sp.finish_with_message(format!(
                "{}: {} hits, {} references, {} reads with hits",
                accession, summary.num_hits, summary.num_references, summary.num_reads_with_hits
            ));
            Ok(ExitCode::SUCCESS)
        }

        Commands::BestHitsPerRead {
            alignments,
            output_dir,
            accession,
            compression,
        } => {
            let sp = spinner("green", "Selecting best hit per read...");
            let table = read_alignment_table(&alignments)?;
            let hits = best_hit_per_read(&table);
            let mut text = String::new();
            for hit in &hits {
                text.push_str(&hit.to_tsv_line());
                text.push('\n');
            }
            let paths = ReportPaths::new(&output_dir, &accession, compression.into());
            write_text(paths.best_hits_per_read(), &text, compression.into())?;
            sp.finish_with_message(format!("{} reads written.", hits.len()));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Ecotype {
            metadata,
            replacements,
            header,
        } => {
            if header {
                println!("{}", ECOTYPE_HEADER);
                return Ok(ExitCode::SUCCESS);
            }
            let (metadata, replacements) = match (metadata, replacements) {
                (Some(m), Some(r)) => (m, r),
                _ => {
                    return Err(StatsError::InvalidConfig(
                        "SRA_XML and REPLACEMENTS are required".to_string(),
                    ))
                }
            };
            let accession = accession_from_path(&metadata).unwrap_or_default();
            let doc = MetadataDocument::from_path(&metadata)?;
            let lookup = EcotypeLookup::from_path(&replacements)?;
            println!("{}", classify_ecotype(&accession, &doc, &lookup).to_tsv_row());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Coverage {
            alignments,
            output_prefix,
            bins,
            lengths,
        } => {
            let table = read_alignment_table(&alignments)?;
            let lengths = match lengths {
                Some(path) => ReferenceLengths::from_path(path)?,
                None => ReferenceLengths::from_table(&table),
            };
            let report = coverage_bins(&table, &lengths, bins)?;
            let text = report.to_tsv();
            if output_prefix == "-" {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                out.write_all(text.as_bytes())?;
                out.flush()?;
            } else {
                let path = format!("{}.tsv", output_prefix);
                write_text(Path::new(&path), &text, Compression::None)?;
                log::info!("Coverage of {} sequences written to {}", report.rows.len(), path);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Batch {
            manifest,
            output_dir,
            threads,
            analysis,
        } => {
            let config = analysis.to_config()?;
            let entries = read_manifest(&manifest)?;
            if threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .map_err(|e| StatsError::InvalidConfig(e.to_string()))?;
            }

            let bar = ProgressBar::new(entries.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                    .expect("Invalid progress template"),
            );
            let outcomes = run_batch(&entries, &config, &output_dir, |outcome| {
                bar.set_message(outcome.accession.clone());
                bar.inc(1);
            });
            let failed = failure_count(&outcomes);
            bar.finish_with_message(format!(
                "{} accessions done, {} failed",
                outcomes.len() - failed,
                failed
            ));

            for outcome in outcomes.iter().filter(|o| o.result.is_err()) {
                if let Err(e) = &outcome.result {
                    eprintln!("{}\t{}", outcome.accession, e);
                }
            }
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
    }
}
