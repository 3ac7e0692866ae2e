//! Component H: the CLI surface and resolved run configuration (§4.H).
//!
//! Grounded on the teacher's own flat `#[derive(Parser)]` `Args` struct in
//! `main.rs`: one struct, `#[clap(...)]` per field, flags grouped with
//! `help_heading`. `Cli` is what `clap` parses directly; `RunConfig` is the
//! fully resolved, library-facing form `main` builds from it once (§3.1).

use crate::error::EngineError;
use crate::persist::MatrixFormat;
use crate::transcript_id::TranscriptIdParser;
use clap::Parser;
use std::path::PathBuf;

/// Infer orthologs and an exact-rational distance matrix across de novo
/// assembled transcriptomes from reciprocal-best-match gene graphs.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Sample FASTA files (one per sample; sample name is the filename
    /// stem unless `--sample-regex` overrides it)
    #[clap(value_name = "FASTA", num_args = 1.., required = true)]
    pub inputs: Vec<PathBuf>,

    /// Regex with a single capture group used to derive a sample name from
    /// each input filename, instead of the filename stem
    #[clap(long = "sample-regex", help_heading = "Input")]
    pub sample_regex: Option<String>,

    /// Number of top genes to retain per sample, by max isoform coverage
    #[clap(long = "top-genes", default_value_t = 1000, help_heading = "Selection")]
    pub top_genes: usize,

    /// Top-N_top distinct subject genes kept per query gene in each
    /// directional search (component C)
    #[clap(long = "top-matches", default_value_t = 1, help_heading = "Matching")]
    pub top_matches: usize,

    /// Keep every row tied for the best per-query-gene bitscore, rather
    /// than deterministically keeping only the first
    #[clap(long = "keep-all", help_heading = "Matching")]
    pub keep_all: bool,

    /// E-value cutoff passed to the aligner
    #[clap(long = "evalue", default_value_t = 1e-50, help_heading = "Matching")]
    pub evalue: f64,

    /// Regex used to parse `coverage`/`gene`/`isoform` out of each FASTA
    /// header (named groups, or positional fallback)
    #[clap(
        long = "pattern",
        default_value = r"^.*cov_([0-9]+(?:\.[0-9]+)?)_g([0-9]+)_i([0-9]+)",
        help_heading = "Matching"
    )]
    pub pattern: String,

    /// Worker-pool size; default is the number of logical CPUs minus one
    #[clap(long = "jobs", short = 'j', help_heading = "Execution")]
    pub jobs: Option<usize>,

    /// Directory for cached reduced FASTAs, per-pair tables, and the graph
    #[clap(long = "output-dir", default_value = "rna-clique-out", help_heading = "Output")]
    pub output_dir: PathBuf,

    /// Distance-matrix output format
    #[clap(long = "format", default_value = "tsv", value_parser = ["whitespace", "tsv", "csv"], help_heading = "Output")]
    pub format: String,

    /// Emit dissimilarity (1 - similarity) instead of similarity
    #[clap(long = "dissimilarity", help_heading = "Output")]
    pub dissimilarity: bool,

    /// Suppress all but warning/error log output
    #[clap(long = "quiet", short = 'q', help_heading = "Logging")]
    pub quiet: bool,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[clap(short = 'v', action = clap::ArgAction::Count, help_heading = "Logging")]
    pub verbose: u8,
}

/// One sample as named on the CLI: its name and input FASTA path.
#[derive(Debug, Clone)]
pub struct NamedSample {
    pub name: String,
    pub fasta_path: PathBuf,
}

/// The fully resolved parameters for one invocation (§3.1), built once
/// from `Cli` and passed by reference into components B-G.
pub struct RunConfig {
    pub samples: Vec<NamedSample>,
    pub top_genes: usize,
    pub top_matches: usize,
    pub keep_all: bool,
    pub evalue: f64,
    pub id_parser: TranscriptIdParser,
    pub jobs: usize,
    pub sample_count_override: Option<usize>,
    pub output_dir: PathBuf,
    pub format: MatrixFormat,
    pub dissimilarity: bool,
}

fn sample_name(path: &std::path::Path, sample_regex: Option<&regex::Regex>) -> Result<String, EngineError> {
    if let Some(re) = sample_regex {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let caps = re.captures(file_name).ok_or_else(|| {
            EngineError::Config(format!(
                "sample-regex {:?} did not match filename {:?}",
                re.as_str(),
                file_name
            ))
        })?;
        let name = caps
            .get(1)
            .ok_or_else(|| EngineError::Config("sample-regex has no capture group".to_string()))?;
        Ok(name.as_str().to_string())
    } else {
        Ok(path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string())
    }
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, EngineError> {
        let sample_regex = cli
            .sample_regex
            .as_deref()
            .map(regex::Regex::new)
            .transpose()
            .map_err(|e| EngineError::Config(format!("invalid --sample-regex: {e}")))?;

        let mut samples = Vec::with_capacity(cli.inputs.len());
        for path in &cli.inputs {
            let name = sample_name(path, sample_regex.as_ref())?;
            samples.push(NamedSample {
                name,
                fasta_path: path.clone(),
            });
        }

        let id_parser = TranscriptIdParser::from_pattern(&cli.pattern)?;
        let format = MatrixFormat::parse(&cli.format)
            .ok_or_else(|| EngineError::Config(format!("unknown --format {:?}", cli.format)))?;

        // Mirrors the teacher's own `num_cpus`-driven defaults: all
        // logical CPUs minus one, clamped to at least one worker.
        let jobs = cli
            .jobs
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1));

        Ok(RunConfig {
            samples,
            top_genes: cli.top_genes,
            top_matches: cli.top_matches,
            keep_all: cli.keep_all,
            evalue: cli.evalue,
            id_parser,
            jobs,
            sample_count_override: None,
            output_dir: cli.output_dir.clone(),
            format,
            dissimilarity: cli.dissimilarity,
        })
    }
}
