use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use fmwalk::pipeline::{self, RunConfig};
use fmwalk::walk::{Mode, WalkParams};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "fmwalk",
    author,
    version,
    about = "FM-index guided read merging, kmerization and long-read correction",
    arg_required_else_help = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the read-collection FM index
    Index {
        /// Reads (FASTA or FASTQ)
        reads: String,
        /// Output prefix; the index is written to <prefix>.fmw
        #[arg(short, long, default_value = "reads")]
        output: String,
    },
    /// Merge, kmerize, validate or correct reads against an index
    Walk(WalkArgs),
}

#[derive(Args, Debug)]
struct WalkArgs {
    /// Path to read index (.fmw)
    #[arg(short = 'i', long = "index")]
    index: String,
    /// Reads (FASTA or FASTQ); interleaved pairs in paired modes without a mate file
    reads: String,
    /// Second-end reads for paired modes
    mates: Option<String>,
    #[arg(short, long, value_enum, default_value_t = Mode::MergeAndKmerize)]
    mode: Mode,
    /// Output prefix for <prefix>.{corrected,discard,failed}.fa
    #[arg(short, long, default_value = "walk")]
    output: String,
    #[arg(short = 'k', long = "kmer", default_value_t = 31)]
    kmer_length: usize,
    #[arg(long = "min-kmer", default_value_t = 15)]
    min_kmer_length: usize,
    #[arg(long = "min-overlap", default_value_t = 41)]
    min_overlap: usize,
    #[arg(long = "max-overlap")]
    max_overlap: Option<usize>,
    #[arg(long = "max-insert", default_value_t = 400)]
    max_insert_size: usize,
    #[arg(long = "max-leaves", default_value_t = 32)]
    max_leaves: usize,
    #[arg(long = "seed-threshold", default_value_t = 10)]
    seed_kmer_threshold: usize,
    #[arg(long = "kmer-threshold", default_value_t = 2)]
    kmer_threshold: usize,
    #[arg(long = "search-threshold", default_value_t = 2)]
    search_kmer_threshold: usize,
    #[arg(long = "downward", default_value_t = 3)]
    downward: usize,
    #[arg(long = "collected-seeds", default_value_t = 5)]
    collected_seeds: usize,
    /// Copy only corrected seeds and bridges instead of the whole read on failure
    #[arg(long = "split")]
    split_on_failure: bool,
    #[arg(long = "max-seed-gap", default_value_t = 500)]
    max_seed_gap: usize,
    #[arg(long = "merge-strong-intervals")]
    merge_strong_intervals: bool,
    /// Validate mode: cut unsplit reads at repeat/unique boundaries
    #[arg(long = "split-repeats")]
    split_repeats: bool,
    /// Assumed long-read error rate for adaptive seed walk distance
    #[arg(long = "seed-error-rate", default_value_t = 0.15)]
    seed_error_rate: f64,
    /// Minimum seed k-mer count on each strand (0 = off)
    #[arg(long = "min-strand-support", default_value_t = 0)]
    min_strand_support: usize,
    /// Skip seeds whose k-mer frequency reaches this count
    #[arg(long = "contaminated-cutoff")]
    contaminated_cutoff: Option<usize>,
    /// Keep trying lookahead targets after repeated asymmetric walks
    #[arg(long = "no-asymmetric-stop")]
    no_asymmetric_stop: bool,
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
}

impl WalkArgs {
    fn params(&self) -> WalkParams {
        WalkParams {
            kmer_length: self.kmer_length,
            min_kmer_length: self.min_kmer_length,
            min_overlap: self.min_overlap,
            max_overlap: self.max_overlap,
            max_insert_size: self.max_insert_size,
            max_leaves: self.max_leaves,
            seed_kmer_threshold: self.seed_kmer_threshold,
            kmer_threshold: self.kmer_threshold,
            search_kmer_threshold: self.search_kmer_threshold,
            downward: self.downward,
            collected_seeds: self.collected_seeds,
            split_on_failure: self.split_on_failure,
            max_seed_gap: self.max_seed_gap,
            merge_strong_intervals: self.merge_strong_intervals,
            split_repeats: self.split_repeats,
            median_kmer_freq: 0,
            seed_error_rate: self.seed_error_rate,
            min_strand_support: self.min_strand_support,
            contaminated_cutoff: self.contaminated_cutoff.unwrap_or(usize::MAX),
            stop_on_repeated_asymmetric: !self.no_asymmetric_stop,
        }
    }

    fn into_config(self) -> RunConfig {
        let params = self.params();
        RunConfig {
            index_path: self.index,
            reads_path: self.reads,
            mates_path: self.mates,
            output_prefix: self.output,
            mode: self.mode,
            params,
            threads: self.threads,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Index { reads, output } => {
            let path = pipeline::build_index(&reads, &output)?;
            println!("read index saved: {}", path);
            Ok(())
        }
        Commands::Walk(args) => {
            let totals = pipeline::run(&args.into_config())?;
            print!("{}", totals);
            Ok(())
        }
    }
}
