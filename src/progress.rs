//! Progress reporting and cancellation support.
//!
//! A long video can take many minutes to label because every sampled frame
//! is a network round trip. [`ProgressCallback`] lets callers observe the
//! run and [`CancellationToken`] lets them stop it between frames.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framelabel::{PipelineConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} frames)", info.current);
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::new("input.mp4").with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of run progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many frames have been processed so far.
    pub current: u64,
    /// Total sampled frames expected, if the video's frame count is known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Absolute index of the frame just processed.
    pub current_frame: Option<u64>,
    /// Detection failures seen so far.
    pub failed_detections: u64,
}

/// Trait for receiving progress updates during a run.
///
/// Callbacks observe but cannot halt the run. Use [`CancellationToken`] for
/// that.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once at the end of the run.
    fn on_progress(&self, info: &ProgressInfo);
}

pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state, so one clone can be handed to a signal handler while
/// the pipeline checks another before each frame.
///
/// ```
/// use framelabel::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
/// token.clone().cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts processed frames and fires the callback every `batch_size` of them.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    batch_size: u64,
    started: Instant,
    processed: u64,
    failed: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total,
            batch_size: batch_size.max(1),
            started: Instant::now(),
            processed: 0,
            failed: 0,
        }
    }

    pub(crate) fn advance(&mut self, frame_index: u64, detection_failed: bool) {
        self.processed += 1;
        self.failed += u64::from(detection_failed);

        if self.processed % self.batch_size == 0 {
            self.callback.on_progress(&self.snapshot(Some(frame_index)));
        }
    }

    pub(crate) fn finish(&self) {
        self.callback.on_progress(&self.snapshot(None));
    }

    fn snapshot(&self, current_frame: Option<u64>) -> ProgressInfo {
        let elapsed = self.started.elapsed();
        // The total comes from an estimated frame count and may undershoot.
        let total = self.total.filter(|&total| total > 0);

        let percentage =
            total.map(|total| (self.processed as f32 * 100.0 / total as f32).min(100.0));
        let estimated_remaining = total.filter(|_| self.processed > 0).map(|total| {
            let remaining = total.saturating_sub(self.processed);
            elapsed.mul_f64(remaining as f64 / self.processed as f64)
        });

        ProgressInfo {
            current: self.processed,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame,
            failed_detections: self.failed,
        }
    }
}
