//! Multi-pass scan progress tracking.
//!
//! The service reports `(pass, percent)` on every frame. The tracker keeps
//! the view monotonic within a session and latches the end-of-scan signal
//! exactly once: the first frame whose pass exceeds [`TOTAL_PASSES`] means
//! the sweep is done and the client must stop requesting frames and wait
//! for the analysis result.

use serde::Serialize;

/// Number of sweeps in a full scan. A reported pass above this value is a
/// completion signal, not a display value.
pub const TOTAL_PASSES: u32 = 2;

/// Monotonic view of multi-pass scan progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanProgress {
    /// Current pass, clamped to `1..=TOTAL_PASSES` for display.
    pub pass: u32,
    /// Completion percentage within the current pass (0-100).
    pub percent: f64,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            pass: 1,
            percent: 0.0,
        }
    }
}

/// Signal returned by [`ScanProgressTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    /// Keep streaming; more frames are expected.
    Continue,
    /// All passes done. Emitted exactly once per session; stop issuing
    /// frame credits and await the analysis result.
    ScanComplete,
}

/// Folds server-reported `(pass, percent)` values into a monotonic view.
#[derive(Debug, Default)]
pub struct ScanProgressTracker {
    progress: ScanProgress,
    complete: bool,
}

impl ScanProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current progress view. `pass` never decreases and never shows a
    /// value above [`TOTAL_PASSES`].
    pub fn progress(&self) -> ScanProgress {
        self.progress
    }

    /// Whether the end-of-scan latch has fired.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Fold one frame's reported `(pass, percent)` into the view.
    ///
    /// Returns [`ProgressSignal::ScanComplete`] only for the first frame
    /// whose pass exceeds [`TOTAL_PASSES`]; any repeats that arrive before
    /// the channel is torn down return [`ProgressSignal::Continue`].
    pub fn observe(&mut self, pass: u32, percent: f64) -> ProgressSignal {
        // The service may briefly re-report an earlier pass; keep the
        // displayed pass monotonic and within the pass count.
        self.progress.pass = pass.min(TOTAL_PASSES).max(self.progress.pass);
        self.progress.percent = percent.clamp(0.0, 100.0);

        if pass > TOTAL_PASSES && !self.complete {
            self.complete = true;
            return ProgressSignal::ScanComplete;
        }
        ProgressSignal::Continue
    }
}
