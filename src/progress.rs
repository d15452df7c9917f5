//! Progress reporting and cancellation.
//!
//! Watermarking reports coarse progress as the percentage of frames
//! processed. Implement [`ProgressCallback`] to receive [`ProgressInfo`]
//! snapshots, and share a [`CancellationToken`] to stop a run between
//! frames.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidmark::{ProgressCallback, ProgressInfo, WatermarkOptions, Watermarker};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(percent) = info.percent {
//!             println!("{percent}%");
//!         }
//!     }
//! }
//!
//! let options = WatermarkOptions::new().with_progress(Arc::new(PrintProgress));
//! Watermarker::new(options).run("input.mp4", "logo.png", "output.mp4")?;
//! # Ok::<(), vidmark::WatermarkError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of watermarking progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames processed so far.
    pub current: u64,
    /// Total frames expected, if known.
    pub total: Option<u64>,
    /// Whole-number completion percentage (0-100), if `total` is known.
    pub percent: Option<u8>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining from current throughput.
    pub estimated_remaining: Option<Duration>,
    /// `true` for the last report of a run.
    pub finished: bool,
}

/// Receives progress updates.
///
/// Must be [`Send`] + [`Sync`]: jobs started with
/// [`Watermarker::spawn`](crate::Watermarker::spawn) call it from their
/// worker thread. Callbacks observe only; use [`CancellationToken`] to stop.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once at the end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Forwards every update into an [`std::sync::mpsc`] channel.
///
/// Handy for driving a UI thread from a spawned job. Send errors (receiver
/// dropped) are ignored.
#[derive(Debug)]
pub struct ChannelProgress {
    sender: std::sync::Mutex<std::sync::mpsc::Sender<ProgressInfo>>,
}

impl ChannelProgress {
    /// Create a callback and the receiving end of its channel.
    pub fn new() -> (Self, std::sync::mpsc::Receiver<ProgressInfo>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        (
            Self {
                sender: std::sync::Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(info.clone());
        }
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. The frame loop checks the token before every frame.
///
/// ```
/// use vidmark::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-number percentage of `current` out of `total`, truncated and
/// clamped to 100. `None` when `total` is zero.
pub fn percent_complete(current: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(current) * 100 / u128::from(total)).min(100);
    Some(percent as u8)
}

/// Tracks timing and fires the callback every `batch_size` frames.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total: total.filter(|&t| t > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one processed frame.
    pub(crate) fn advance(&mut self) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(false);
            self.items_since_last_report = 0;
        }
    }

    /// Emit the final report. A completed run reports 100% even when the
    /// frame count was an underestimate or overestimate.
    pub(crate) fn finish(&mut self) {
        self.report(true);
    }

    /// Emit the final report of a stopped run. The percentage reflects the
    /// frames actually processed.
    pub(crate) fn abort(&mut self) {
        let elapsed = self.start_time.elapsed();
        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percent: self.total.and_then(|total| percent_complete(self.current, total)),
            elapsed,
            estimated_remaining: None,
            finished: true,
        });
    }

    fn report(&self, finished: bool) {
        let elapsed = self.start_time.elapsed();

        let percent = if finished {
            Some(100)
        } else {
            self.total.and_then(|total| percent_complete(self.current, total))
        };

        let estimated_remaining = match self.total {
            _ if finished => Some(Duration::ZERO),
            Some(total) if self.current > 0 => {
                let remaining = total.saturating_sub(self.current);
                let per_item = elapsed.as_secs_f64() / self.current as f64;
                Some(Duration::from_secs_f64(per_item * remaining as f64))
            }
            _ => None,
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percent,
            elapsed,
            estimated_remaining,
            finished,
        };

        self.callback.on_progress(&info);
    }
}
