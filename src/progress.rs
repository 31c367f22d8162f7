//! Resume bookkeeping for interrupted runs.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::storage;

/// Default progress file name.
pub const DEFAULT_PROGRESS_FILE: &str = "osrm_progress.json";

/// Snapshot of how far a run got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Number of tasks fully processed, counted from the start of the list.
    pub processed: usize,
    pub total: usize,
    pub last_route_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    path: PathBuf,
}

impl ProgressTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the saved record, if any. Unreadable files are logged and
    /// treated as absent.
    pub fn load(&self) -> Option<ProgressRecord> {
        match storage::read_json::<ProgressRecord>(&self.path) {
            Ok(Some(record)) => {
                info!(
                    processed = record.processed,
                    total = record.total,
                    "found previous progress"
                );
                Some(record)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "progress file unreadable, ignoring it");
                None
            }
        }
    }

    /// Replaces the saved record.
    pub fn save(&self, processed: usize, total: usize, last_route_id: &str) -> Result<ProgressRecord, StorageError> {
        let record = ProgressRecord {
            processed,
            total,
            last_route_id: last_route_id.to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        storage::write_json(&self.path, &record)?;
        Ok(record)
    }

    /// Deletes the saved record. Only called after a fully successful run.
    pub fn clear(&self) -> Result<(), StorageError> {
        storage::remove_file(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// How the resume question is settled before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    /// Continue from the saved record without asking.
    Resume,
    /// Nothing to resume.
    StartOver,
    /// Ask the user on the terminal.
    Ask,
}

/// Settles the resume question without any I/O.
///
/// Only an interactive session with saved progress and no blanket "yes" is
/// asked. Unattended runs always pick up where the last one stopped.
pub fn resume_choice(has_record: bool, assume_yes: bool, interactive: bool) -> ResumeChoice {
    if !has_record {
        ResumeChoice::StartOver
    } else if assume_yes || !interactive {
        ResumeChoice::Resume
    } else {
        ResumeChoice::Ask
    }
}

/// Decides where a run starts.
///
/// Resumes from `record.processed` only when `auto_resume` is set and the
/// record describes a task list of the same length; otherwise starts at 0.
pub fn resume_offset(record: Option<&ProgressRecord>, total: usize, auto_resume: bool) -> usize {
    let Some(record) = record else {
        return 0;
    };

    if !auto_resume {
        info!(processed = record.processed, "previous progress found, starting over");
        return 0;
    }

    if record.total != total {
        warn!(
            recorded_total = record.total,
            total, "task list changed since the saved progress, starting over"
        );
        return 0;
    }

    record.processed.min(total)
}
