use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use route_enricher::fetcher::{RetryPolicy, RouteFetcher};
use route_enricher::osrm::{OsrmClient, OsrmConfig};
use route_enricher::pipeline::{CancellationFlag, Pipeline, PipelineOptions, StoragePaths};
use route_enricher::progress::{ProgressRecord, ProgressTracker, ResumeChoice, resume_choice};
use route_enricher::report::RunOutcome;
use route_enricher::route::DEFAULT_PRECISION;
use route_enricher::simplify::DEFAULT_EPSILON;
use route_enricher::storage;
use route_enricher::store::RecordStore;

#[derive(Parser, Debug)]
#[command(name = "route-enricher")]
#[command(about = "Add OSRM road paths to aggregated route records", long_about = None)]
struct Args {
    /// Route store to read (year -> route id -> record)
    #[arg(long)]
    input: PathBuf,

    /// Where to write the result (defaults to the input file)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fetch road paths; without this the store is only copied through
    #[arg(long)]
    enrich: bool,

    /// Only enrich the N heaviest routes
    #[arg(long, num_args = 0..=1, default_missing_value = "100", value_name = "N")]
    top: Option<usize>,

    /// Resume from saved progress without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Route cache file (defaults to osrm_route_cache.json next to the input)
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Progress file (defaults to osrm_progress.json next to the input)
    #[arg(long)]
    progress_file: Option<PathBuf>,

    /// Checkpoint snapshot of the store (defaults to <input>_temp.json)
    #[arg(long)]
    snapshot_file: Option<PathBuf>,

    /// OSRM server base URL
    #[arg(long, env = "OSRM_BASE_URL", default_value = "http://router.project-osrm.org")]
    osrm_url: String,

    /// OSRM routing profile
    #[arg(long, default_value = "driving")]
    profile: String,

    /// Per-request timeout
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Attempts per route, counting the first
    #[arg(long, default_value = "3")]
    max_attempts: u32,

    /// Backoff unit between timed-out attempts
    #[arg(long, default_value = "2000")]
    retry_delay_ms: u64,

    /// Pause after every live request
    #[arg(long, default_value = "100")]
    request_interval_ms: u64,

    /// Routes between checkpoints
    #[arg(long, default_value = "50")]
    batch_size: usize,

    /// Path simplification tolerance in degrees
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// Decimals used when deriving route ids
    #[arg(long, default_value_t = DEFAULT_PRECISION)]
    precision: u32,

    /// Disable the live progress line
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn storage_paths(&self) -> StoragePaths {
        let defaults = StoragePaths::for_store(&self.input);
        StoragePaths {
            cache_file: self.cache_file.clone().unwrap_or(defaults.cache_file),
            progress_file: self.progress_file.clone().unwrap_or(defaults.progress_file),
            snapshot_file: self.snapshot_file.clone().unwrap_or(defaults.snapshot_file),
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let output = args.output.clone().unwrap_or_else(|| args.input.clone());

    let mut store = RecordStore::load(&args.input)
        .with_context(|| format!("loading route store {}", args.input.display()))?;
    info!(
        routes = store.route_count(),
        with_paths = store.routes_with_paths(),
        "loaded route store"
    );

    if !args.enrich {
        store
            .save(&output)
            .with_context(|| format!("writing {}", output.display()))?;
        print_coverage(&store);
        return Ok(());
    }

    let paths = args.storage_paths();
    let auto_resume = decide_resume(&ProgressTracker::new(&paths.progress_file), args.yes)?;

    let client = OsrmClient::new(OsrmConfig {
        base_url: args.osrm_url.clone(),
        profile: args.profile.clone(),
        timeout_secs: args.timeout_secs,
    })
    .context("building HTTP client")?;
    let fetcher = RouteFetcher::new(
        client,
        RetryPolicy {
            max_attempts: args.max_attempts,
            base_delay: Duration::from_millis(args.retry_delay_ms),
        },
    );

    let options = PipelineOptions {
        batch_size: args.batch_size,
        request_interval: Duration::from_millis(args.request_interval_ms),
        epsilon: args.epsilon,
        precision: args.precision,
        top_n: args.top,
        auto_resume,
        show_progress: !args.no_progress,
    };
    let mut pipeline = Pipeline::open(fetcher, &paths, options)?;

    let cancel = CancellationFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel()).context("installing Ctrl-C handler")?;

    let report = pipeline.run(&mut store, &cancel)?;
    println!("{}", report);

    match report.outcome {
        RunOutcome::Completed => {
            store
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(path = %output.display(), "saved enriched store");
            remove_snapshot(&paths.snapshot_file);
            print_coverage(&store);
        }
        RunOutcome::Interrupted => {
            println!(
                "Progress saved. Run again with --yes to continue from route {}.",
                report.processed + 1
            );
        }
    }
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

/// Decides whether to continue an earlier run. Only an interactive terminal
/// is asked; unattended runs resume.
fn decide_resume(tracker: &ProgressTracker, assume_yes: bool) -> Result<bool> {
    let record = tracker.load();
    match resume_choice(record.is_some(), assume_yes, io::stdin().is_terminal()) {
        ResumeChoice::StartOver => Ok(false),
        ResumeChoice::Resume => {
            if !assume_yes {
                info!("stdin is not a terminal, resuming saved progress");
            }
            Ok(true)
        }
        ResumeChoice::Ask => match record {
            Some(record) => prompt_resume(&record),
            None => Ok(false),
        },
    }
}

fn prompt_resume(record: &ProgressRecord) -> Result<bool> {
    print!(
        "Found progress from {}: {}/{} routes done. Resume? (y/n): ",
        record.timestamp, record.processed, record.total
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn remove_snapshot(path: &Path) {
    if let Err(err) = storage::remove_file(path) {
        warn!(error = %err, "could not remove snapshot");
    }
}

fn print_coverage(store: &RecordStore) {
    let total = store.route_count();
    let with_paths = store.routes_with_paths();
    let share = if total == 0 {
        0.0
    } else {
        with_paths as f64 / total as f64 * 100.0
    };
    println!("Routes with paths: {}/{} ({:.1}%)", with_paths, total, share);
}
