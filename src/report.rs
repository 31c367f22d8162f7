//! Live progress line and end-of-run summary.

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 50;

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Interrupted,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub total: usize,
    /// Tasks fully processed, counted from the start of the task list.
    pub processed: usize,
    /// Tasks that ended with a path, cached or fetched.
    pub succeeded: usize,
    /// Tasks whose fetch produced no path.
    pub failed: usize,
    /// Tasks without a usable waypoint, or skipped on resume with no cached path.
    pub skipped: usize,
    pub cache_hits: usize,
    /// Tasks that made a live request to the routing service.
    pub fetched: usize,
    /// Raw points received for fetched paths.
    pub points_before: usize,
    /// Points kept after simplification.
    pub points_after: usize,
    /// Store records patched when the run completed.
    pub records_patched: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            outcome: RunOutcome::Interrupted,
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            cache_hits: 0,
            fetched: 0,
            points_before: 0,
            points_after: 0,
            records_patched: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Share of attempted tasks that ended with a path, in percent.
    pub fn success_rate(&self) -> Option<f64> {
        let attempted = self.succeeded + self.failed;
        (attempted > 0).then(|| self.succeeded as f64 / attempted as f64 * 100.0)
    }

    /// Point reduction from simplification, in percent.
    pub fn reduction(&self) -> Option<f64> {
        (self.points_before > 0)
            .then(|| (1.0 - self.points_after as f64 / self.points_before as f64) * 100.0)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headline = match self.outcome {
            RunOutcome::Completed => "Route enrichment complete",
            RunOutcome::Interrupted => "Route enrichment interrupted",
        };
        writeln!(f, "{}", headline)?;
        writeln!(f, "  Processed:    {}/{}", self.processed, self.total)?;
        writeln!(
            f,
            "  Success:      {} ({} from cache, {} fetched)",
            self.succeeded,
            self.cache_hits,
            self.succeeded.saturating_sub(self.cache_hits)
        )?;
        writeln!(f, "  Failed:       {}", self.failed)?;
        writeln!(f, "  Skipped:      {}", self.skipped)?;
        if let Some(rate) = self.success_rate() {
            writeln!(f, "  Success rate: {:.1}%", rate)?;
        }
        if let Some(reduction) = self.reduction() {
            writeln!(
                f,
                "  Simplified:   {} -> {} points ({:.1}% reduction)",
                self.points_before, self.points_after, reduction
            )?;
        }
        write!(f, "  Total time:   {}", format_duration(self.elapsed))
    }
}

/// Single-line progress indicator rewritten in place on stderr.
#[derive(Debug)]
pub struct ProgressLine {
    enabled: bool,
    started: Instant,
    start_offset: usize,
}

impl ProgressLine {
    /// `start_offset` is the number of tasks already done when the run began;
    /// throughput is measured only over the tasks handled by this run.
    pub fn new(enabled: bool, start_offset: usize) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            start_offset,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn update(&self, current: usize, total: usize, succeeded: usize, failed: usize) {
        if !self.enabled {
            return;
        }
        let line = render(
            current,
            total,
            succeeded,
            failed,
            self.start_offset,
            self.started.elapsed(),
        );
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();
    }

    pub fn finish(&self) {
        if self.enabled {
            let _ = writeln!(io::stderr());
        }
    }
}

fn render(
    current: usize,
    total: usize,
    succeeded: usize,
    failed: usize,
    start_offset: usize,
    elapsed: Duration,
) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        current as f64 / total as f64
    };
    let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));

    let done_here = current.saturating_sub(start_offset);
    let (speed, eta) = match eta(done_here, total.saturating_sub(current), elapsed) {
        Some(eta) => (
            format!("{:.1} routes/s", done_here as f64 / elapsed.as_secs_f64()),
            format_duration(eta),
        ),
        None => ("0 routes/s".to_string(), "calculating...".to_string()),
    };

    format!(
        "|{}| {:.1}% ({}/{}) ✓{} ✗{} | Speed: {} | ETA: {}",
        bar,
        fraction * 100.0,
        current,
        total,
        succeeded,
        failed,
        speed,
        eta
    )
}

/// Remaining time from the average throughput so far, or `None` until
/// something has been measured.
pub fn eta(done: usize, remaining: usize, elapsed: Duration) -> Option<Duration> {
    let secs = elapsed.as_secs_f64();
    if done == 0 || secs <= 0.0 {
        return None;
    }
    let rate = done as f64 / secs;
    Some(Duration::from_secs_f64(remaining as f64 / rate))
}

/// `H:MM:SS`, with a day prefix past 24 hours.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, seconds),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, seconds),
        _ => format!("{} days, {}:{:02}:{:02}", days, hours, minutes, seconds),
    }
}
