//! osm-history-splitter: cut OSM history files into regional extracts.
//!
//! Usage: osm-history-splitter [OPTIONS] <INPUT> <CONFIG>

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use osm_history_splitter::logging::init_logging;
use osm_history_splitter::{split, CutMode, SplitOptions};

#[derive(Parser)]
#[command(name = "osm-history-splitter")]
#[command(version)]
#[command(about = "Split OpenStreetMap history files into regional extracts", long_about = None)]
struct Cli {
    /// Two passes: copy ways and relations unmodified and pull in every
    /// point and relation they reference
    #[arg(long, conflicts_with = "hardcut")]
    softcut: bool,

    /// One pass: crop ways and relations to what lies inside (default)
    #[arg(long)]
    hardcut: bool,

    /// Log every per-entity decision
    #[arg(long)]
    debug: bool,

    /// Skip input order validation (input must still be sorted)
    #[arg(long)]
    assume_ordered: bool,

    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't')]
    threads: Option<usize>,

    /// Print split statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Input OSM XML file, optionally .xz compressed (use - for stdin)
    input: PathBuf,

    /// Extract configuration: one `<output> <BBOX|POLY|OSM> <argument>` per line
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let mode = if cli.softcut {
        CutMode::Soft
    } else {
        CutMode::Hard
    };
    let options = SplitOptions::new()
        .with_mode(mode)
        .with_assume_ordered(cli.assume_ordered);

    let start = Instant::now();
    match split(&cli.input, &cli.config, &options) {
        Ok(report) => {
            if cli.stats {
                eprint!("Split stats:\n{}", report);
                eprintln!("Elapsed: {:.2?}", start.elapsed());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
