use std::fmt;
use std::time::{Duration, Instant};

/// Frames between two telemetry reports.
pub const REPORT_INTERVAL: u64 = 30;

/// Snapshot of how far a video has been processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub frames: u64,
    pub total_frames: Option<u64>,
    pub elapsed: Duration,
}

impl ProgressReport {
    /// Percent complete, `None` when the frame count is unknown.
    pub fn percent(&self) -> Option<f64> {
        percent(self.frames, self.total_frames)
    }

    /// Average frames per second since the loop started.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.percent(), self.total_frames) {
            (Some(pct), Some(total)) => write!(
                f,
                "Progress: {pct:.1}% ({}/{total}) - FPS: {:.1}",
                self.frames,
                self.fps()
            ),
            _ => write!(f, "Progress: {} frames - FPS: {:.1}", self.frames, self.fps()),
        }
    }
}

/// Counts frames and emits a [`ProgressReport`] every [`REPORT_INTERVAL`] frames.
#[derive(Debug)]
pub struct ProgressTracker {
    total_frames: Option<u64>,
    frames: u64,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total_frames: Option<u64>) -> Self {
        Self {
            total_frames,
            frames: 0,
            started: Instant::now(),
        }
    }

    /// Records one frame; returns a report when the interval is reached.
    pub fn tick(&mut self) -> Option<ProgressReport> {
        self.frames += 1;
        (self.frames % REPORT_INTERVAL == 0).then(|| self.report())
    }

    pub fn report(&self) -> ProgressReport {
        ProgressReport {
            frames: self.frames,
            total_frames: self.total_frames,
            elapsed: self.started.elapsed(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn percent(&self) -> Option<f64> {
        percent(self.frames, self.total_frames)
    }
}

fn percent(frames: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some(frames as f64 / total as f64 * 100.0),
        _ => None,
    }
}

/// Text burned into each output frame: `clip - %12.5`.
pub fn overlay_text(name: &str, frames: u64, total_frames: Option<u64>) -> String {
    match percent(frames, total_frames) {
        Some(pct) => format!("{name} - %{pct:.1}"),
        None => format!("{name} - frame {frames}"),
    }
}
