//! Resumable route-enrichment pipeline.
//!
//! A run moves through `Init → Running → {Completed | Interrupted | Failed}`.
//! The cache, the progress record and a snapshot of the record store are
//! written together at every batch boundary and on every way out of the run
//! loop, so the on-disk state always satisfies "every task up to `processed`
//! is durably cached".

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::{DEFAULT_CACHE_FILE, RouteCache};
use crate::error::{PipelineError, StorageError};
use crate::progress::{DEFAULT_PROGRESS_FILE, ProgressTracker, resume_offset};
use crate::report::{ProgressLine, RunOutcome, RunReport};
use crate::route::{DEFAULT_PRECISION, RouteTask};
use crate::simplify::DEFAULT_EPSILON;
use crate::store::RecordStore;
use crate::traits::RouteSource;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Tasks between checkpoints.
    pub batch_size: usize,
    /// Pause after every task that hit the routing service.
    pub request_interval: Duration,
    /// Simplification tolerance in degrees.
    pub epsilon: f64,
    /// Decimals used when deriving route ids.
    pub precision: u32,
    /// Only enrich the `n` heaviest routes.
    pub top_n: Option<usize>,
    /// Continue from a saved progress record instead of starting over.
    pub auto_resume: bool,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            request_interval: Duration::from_millis(100),
            epsilon: DEFAULT_EPSILON,
            precision: DEFAULT_PRECISION,
            top_n: None,
            auto_resume: false,
            show_progress: true,
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidOption {
                key: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(PipelineError::InvalidOption {
                key: "epsilon",
                reason: format!("must be a positive number, got {}", self.epsilon),
            });
        }
        if self.precision > 10 {
            return Err(PipelineError::InvalidOption {
                key: "precision",
                reason: format!("at most 10 decimals, got {}", self.precision),
            });
        }
        Ok(())
    }
}

/// Where the pipeline keeps its artifacts.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub cache_file: PathBuf,
    pub progress_file: PathBuf,
    /// Intermediate copy of the record store written at every checkpoint.
    pub snapshot_file: PathBuf,
}

impl StoragePaths {
    /// Artifacts next to the store file: the shared cache and progress files,
    /// and `<stem>_temp.json` for snapshots.
    pub fn for_store(store_path: &Path) -> Self {
        let dir = store_path.parent().unwrap_or_else(|| Path::new(""));
        let stem = store_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("routes");
        Self {
            cache_file: dir.join(DEFAULT_CACHE_FILE),
            progress_file: dir.join(DEFAULT_PROGRESS_FILE),
            snapshot_file: dir.join(format!("{}_temp.json", stem)),
        }
    }
}

/// Cooperative stop request shared with a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Running,
    Completed,
    Interrupted,
    Failed,
}

pub struct Pipeline<S> {
    source: S,
    cache: RouteCache,
    progress: ProgressTracker,
    snapshot_path: PathBuf,
    options: PipelineOptions,
    state: PipelineState,
}

impl<S: RouteSource> Pipeline<S> {
    /// Loads the cache and prepares the progress tracker.
    pub fn open(source: S, paths: &StoragePaths, options: PipelineOptions) -> Result<Self, PipelineError> {
        options.validate()?;
        Ok(Self {
            source,
            cache: RouteCache::load(&paths.cache_file),
            progress: ProgressTracker::new(&paths.progress_file),
            snapshot_path: paths.snapshot_file.clone(),
            options,
            state: PipelineState::Init,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The tasks a run over `store` would process, in order.
    pub fn plan(&self, store: &RecordStore) -> Vec<RouteTask> {
        let tasks = store.tasks(self.options.precision);
        match self.options.top_n {
            Some(n) => select_top(tasks, n),
            None => tasks,
        }
    }

    /// Enriches `store` with road paths for every route it contains.
    ///
    /// Paths already present in the store are imported into the cache first,
    /// so they are never fetched again.
    pub fn run(&mut self, store: &mut RecordStore, cancel: &CancellationFlag) -> Result<RunReport, PipelineError> {
        let tasks = self.plan(store);
        self.seed_from(store);
        self.run_tasks(&tasks, store, cancel)
    }

    /// Processes an explicit task list, patching matching records in `store`.
    pub fn run_tasks(
        &mut self,
        tasks: &[RouteTask],
        store: &mut RecordStore,
        cancel: &CancellationFlag,
    ) -> Result<RunReport, PipelineError> {
        let total = tasks.len();
        let start = resume_offset(self.progress.load().as_ref(), total, self.options.auto_resume);
        let batch_size = self.options.batch_size;
        let epsilon = self.options.epsilon;

        info!(
            total,
            start,
            cached = self.cache.len(),
            "starting route enrichment"
        );
        self.state = PipelineState::Running;

        let line = ProgressLine::new(self.options.show_progress, start);
        let mut report = RunReport::new(total);
        let mut checkpoint = Checkpoint {
            cache: &mut self.cache,
            progress: &self.progress,
            store,
            snapshot_path: &self.snapshot_path,
            state: &mut self.state,
            total,
            processed: start,
            durable: start,
            last_route_id: String::new(),
            armed: true,
        };

        let mut interrupted = false;
        for (index, task) in tasks.iter().enumerate() {
            let position = index + 1;

            if position <= start {
                // Done in an earlier run. Reuse whatever it cached, never fetch.
                match checkpoint.cache.get(task.id()) {
                    Some(entry) => {
                        checkpoint.store.apply_task(task, entry);
                        report.succeeded += 1;
                        report.cache_hits += 1;
                    }
                    None => report.skipped += 1,
                }
                continue;
            }

            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let mut live = false;
            if let Some(entry) = checkpoint.cache.get(task.id()) {
                debug!(route = task.id(), "cache hit");
                checkpoint.store.apply_task(task, entry);
                report.succeeded += 1;
                report.cache_hits += 1;
            } else if let Some(via) = task.via() {
                live = true;
                report.fetched += 1;
                match self.source.fetch(task.source(), via, task.destination()) {
                    Some(raw) => {
                        let simplified = raw.simplified(epsilon);
                        debug!(
                            route = task.id(),
                            points = raw.path.len(),
                            kept = simplified.path.len(),
                            "route enriched"
                        );
                        report.points_before += raw.path.len();
                        report.points_after += simplified.path.len();
                        checkpoint.store.apply_task(task, &simplified);
                        checkpoint.cache.put(task.id(), simplified);
                        report.succeeded += 1;
                    }
                    None => report.failed += 1,
                }
            } else {
                debug!(route = task.id(), "no waypoint, skipping");
                report.skipped += 1;
            }

            checkpoint.processed = position;
            checkpoint.last_route_id = task.id().to_string();
            line.update(position, total, report.succeeded, report.failed);

            if position % batch_size == 0 {
                line.finish();
                if let Err(err) = checkpoint.save() {
                    error!(error = %err, processed = position, "checkpoint failed");
                    return Err(err.into());
                }
                info!(processed = position, total, "checkpoint saved");
            }

            if live && !self.options.request_interval.is_zero() {
                thread::sleep(self.options.request_interval);
            }
        }
        line.finish();

        report.processed = checkpoint.processed;
        report.elapsed = line.elapsed();

        if interrupted {
            warn!(processed = checkpoint.processed, total, "interrupted, saving progress");
            if checkpoint.last_route_id.is_empty() {
                checkpoint.last_route_id = INTERRUPTED_MARKER.to_string();
            }
            checkpoint.save()?;
            checkpoint.disarm();
            *checkpoint.state = PipelineState::Interrupted;
            report.outcome = RunOutcome::Interrupted;
            return Ok(report);
        }

        checkpoint.cache.flush()?;
        checkpoint.durable = checkpoint.processed;
        report.records_patched = checkpoint
            .store
            .merge_cache(&*checkpoint.cache, self.options.precision);
        checkpoint.disarm();
        drop(checkpoint);

        if let Err(err) = self.progress.clear() {
            self.state = PipelineState::Failed;
            return Err(err.into());
        }

        self.state = PipelineState::Completed;
        report.outcome = RunOutcome::Completed;
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            patched = report.records_patched,
            "route enrichment complete"
        );
        Ok(report)
    }

    /// Imports paths the store already has into the cache, without replacing
    /// existing entries.
    fn seed_from(&mut self, store: &RecordStore) {
        let mut seeded = 0;
        for (id, entry) in store.existing_paths(self.options.precision) {
            if !self.cache.contains(&id) {
                self.cache.put(id, entry);
                seeded += 1;
            }
        }
        if seeded > 0 {
            info!(seeded, "imported existing store paths into the cache");
        }
    }
}

/// `last_route_id` recorded when a run stops before finishing any task.
const INTERRUPTED_MARKER: &str = "interrupted";
/// `last_route_id` recorded on failure when the last finished task is not durable.
const ERROR_MARKER: &str = "error";

/// Highest-weight `n` tasks; ties keep their original order.
pub fn select_top(mut tasks: Vec<RouteTask>, n: usize) -> Vec<RouteTask> {
    tasks.sort_by(|a, b| b.weight().cmp(&a.weight()));
    tasks.truncate(n);
    tasks
}

/// Mutable run state that must reach disk however the loop ends.
///
/// While armed, dropping it (early return or unwinding) marks the run failed,
/// flushes the cache and records progress at the last point the cache is
/// known to be durable.
struct Checkpoint<'a> {
    cache: &'a mut RouteCache,
    progress: &'a ProgressTracker,
    store: &'a mut RecordStore,
    snapshot_path: &'a Path,
    state: &'a mut PipelineState,
    total: usize,
    processed: usize,
    /// Highest `processed` value for which the cache has been flushed.
    durable: usize,
    last_route_id: String,
    armed: bool,
}

impl Checkpoint<'_> {
    fn save(&mut self) -> Result<(), StorageError> {
        self.cache.flush()?;
        self.durable = self.processed;
        self.progress
            .save(self.processed, self.total, &self.last_route_id)?;
        self.store.save(self.snapshot_path)?;
        debug!(snapshot = %self.snapshot_path.display(), "snapshot written");
        Ok(())
    }

    /// Best-effort save used on abnormal exits; errors are only logged.
    fn salvage(&mut self) {
        match self.cache.flush() {
            Ok(()) => self.durable = self.processed,
            Err(err) => error!(error = %err, "could not flush route cache"),
        }
        let last = if self.durable == self.processed && !self.last_route_id.is_empty() {
            self.last_route_id.as_str()
        } else {
            ERROR_MARKER
        };
        if let Err(err) = self.progress.save(self.durable, self.total, last) {
            error!(error = %err, "could not save progress");
        }
        if let Err(err) = self.store.save(self.snapshot_path) {
            error!(error = %err, "could not write snapshot");
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Checkpoint<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state = PipelineState::Failed;
            warn!(processed = self.processed, "run ended abnormally, saving state");
            self.salvage();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        PipelineOptions::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_options() {
        let zero_batch = PipelineOptions {
            batch_size: 0,
            ..PipelineOptions::default()
        };
        assert!(zero_batch.validate().is_err());

        let bad_epsilon = PipelineOptions {
            epsilon: 0.0,
            ..PipelineOptions::default()
        };
        assert!(bad_epsilon.validate().is_err());

        let nan_epsilon = PipelineOptions {
            epsilon: f64::NAN,
            ..PipelineOptions::default()
        };
        assert!(nan_epsilon.validate().is_err());
    }

    #[test]
    fn test_select_top_is_stable() {
        let task = |name: &str, weight| {
            RouteTask::new((0.0, 0.0), Some(name), None, (1.0, 1.0), 1).with_weight(weight)
        };
        let tasks = vec![task("a", 1), task("b", 5), task("c", 5), task("d", 3)];
        let top = select_top(tasks, 3);
        let names: Vec<_> = top.iter().map(|t| t.via_name().unwrap()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_storage_paths_sit_next_to_store() {
        let paths = StoragePaths::for_store(Path::new("/data/food_flows_by_year.json"));
        assert_eq!(paths.cache_file, PathBuf::from("/data/osrm_route_cache.json"));
        assert_eq!(paths.progress_file, PathBuf::from("/data/osrm_progress.json"));
        assert_eq!(paths.snapshot_file, PathBuf::from("/data/food_flows_by_year_temp.json"));
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let handler_copy = flag.clone();
        assert!(!flag.is_cancelled());
        handler_copy.cancel();
        assert!(flag.is_cancelled());
    }
}
