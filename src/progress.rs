//! Progress reporting for comparisons and hashing.
//!
//! Components emit [`ProgressEvent`]s synchronously after every chunk they
//! read. The [`ProgressSink`] trait receives them; [`Progress`] renders them
//! to the terminal with indicatif, and [`NoProgress`] discards them.
//!
//! Events are purely observational: nothing in the duplicate detection
//! pipeline depends on what a sink does with them.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A single progress signal: an identifier and a fraction in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent<'a> {
    /// Human-readable status, e.g. `docs/a.txt (3 / 10)`.
    pub id: &'a str,
    /// Completed fraction, capped at 1.0.
    pub fraction: f64,
}

impl<'a> ProgressEvent<'a> {
    /// Create an event, clamping the fraction to `[0.0, 1.0]`.
    #[must_use]
    pub fn new(id: &'a str, fraction: f64) -> Self {
        Self {
            id,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Whether this event marks completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fraction >= 1.0
    }

    /// Render as `<id> <percent>%` with two decimals.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!("{} {:.2}%", self.id, self.fraction * 100.0)
    }
}

/// Receiver of progress signals.
///
/// Implement this trait to observe the duplicate detection pipeline.
pub trait ProgressSink: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "compare", "hash reference")
    /// * `total` - Number of files the phase will visit
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    /// Called after every chunk read, and once with 1.0 when an item completes.
    fn on_progress(&self, event: &ProgressEvent<'_>);

    /// Called when a phase completes.
    fn on_phase_end(&self, _phase: &str) {}
}

/// Sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent<'_>) {}
}

/// Terminal progress reporter using indicatif.
///
/// Shows the current item as `<status> <pct>%`, overwritten in place, and
/// leaves one finished line per completed item.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use archive_dedup::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn status_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn new_bar() -> ProgressBar {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        pb.set_style(Self::status_style());
        pb
    }
}

impl ProgressSink for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        log::debug!("Phase '{}' started ({} files)", phase, total);
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(Self::new_bar());
        }
    }

    fn on_progress(&self, event: &ProgressEvent<'_>) {
        if self.quiet {
            return;
        }
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };
        let pb = bar.get_or_insert_with(Self::new_bar);
        let line = event.status_line();
        if event.is_complete() {
            pb.println(line);
            pb.set_message("");
        } else {
            pb.set_message(line);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.bar.lock().ok().and_then(|mut bar| bar.take()) {
            pb.finish_and_clear();
        }
        log::debug!("Phase '{}' finished", phase);
    }
}
