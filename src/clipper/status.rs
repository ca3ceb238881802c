//! Per-window clip outcomes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::coverage::TimeWindow;
use crate::error::Error;

/// Final state of one window; exactly one per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    /// Clip written and validated.
    Written,
    /// No local recording, or pair of recordings, covers the window.
    MissingSource,
    /// Window starts past the end of the primary recording's samples.
    StartOutOfBounds,
    /// Output exists but is below the byte floor.
    TooSmall,
    /// Output missing or empty.
    NoAudio,
    /// Cutting a source segment failed.
    CutFailed,
    /// Joining the two segments failed.
    ConcatFailed,
    /// Spliced sources differ in rate or channel count.
    FormatMismatch,
    /// Window duration rounds to zero samples.
    InvalidWindow,
}

impl ClipStatus {
    /// Manifest spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::MissingSource => "missing_source",
            Self::StartOutOfBounds => "start_out_of_bounds",
            Self::TooSmall => "too_small",
            Self::NoAudio => "no_audio",
            Self::CutFailed => "cut_failed",
            Self::ConcatFailed => "concat_failed",
            Self::FormatMismatch => "format_mismatch",
            Self::InvalidWindow => "invalid_window",
        }
    }
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed cut with the status it maps to.
#[derive(Debug)]
pub struct ClipFailure {
    /// Outcome recorded for the window.
    pub status: ClipStatus,
    /// What went wrong.
    pub error: Error,
}

impl ClipFailure {
    /// Pair a status with its cause.
    pub fn new(status: ClipStatus, error: Error) -> Self {
        Self { status, error }
    }
}

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipOutcome {
    /// Requested window.
    pub window: TimeWindow,
    /// Source recording names, primary first.
    pub source_names: Vec<String>,
    /// Outcome.
    pub status: ClipStatus,
    /// Written clip, set only for [`ClipStatus::Written`].
    pub clip_path: Option<PathBuf>,
    /// Actual clip length for written clips, requested length otherwise.
    pub duration_secs: f64,
}

impl ClipOutcome {
    /// An outcome with no clip.
    pub fn skipped(window: TimeWindow, source_names: Vec<String>, status: ClipStatus) -> Self {
        Self {
            window,
            source_names,
            status,
            clip_path: None,
            duration_secs: window.duration_secs(),
        }
    }

    /// Whether a clip was written.
    pub fn is_written(&self) -> bool {
        self.status == ClipStatus::Written
    }
}

/// Outcomes of one group's clip run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClipSummary {
    /// Windows attempted.
    pub total_windows: usize,
    /// Clips written.
    pub written: usize,
    /// Windows without a clip.
    pub skipped: usize,
    /// One row per window, in window order.
    pub rows: Vec<ClipOutcome>,
}

impl ClipSummary {
    /// Record one outcome.
    pub fn push(&mut self, outcome: ClipOutcome) {
        self.total_windows += 1;
        if outcome.is_written() {
            self.written += 1;
        } else {
            self.skipped += 1;
        }
        self.rows.push(outcome);
    }

    /// Count of rows with `status`.
    pub fn count(&self, status: ClipStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        TimeWindow::new(start, start + chrono::TimeDelta::seconds(90)).unwrap()
    }

    #[test]
    fn test_status_spelling() {
        assert_eq!(ClipStatus::MissingSource.to_string(), "missing_source");
        assert_eq!(ClipStatus::StartOutOfBounds.as_str(), "start_out_of_bounds");
        assert_eq!(
            serde_json::to_string(&ClipStatus::TooSmall).unwrap(),
            "\"too_small\""
        );
    }

    #[test]
    fn test_summary_counts_every_window_once() {
        let mut summary = ClipSummary::default();
        summary.push(ClipOutcome::skipped(window(), vec![], ClipStatus::MissingSource));
        summary.push(ClipOutcome {
            status: ClipStatus::Written,
            clip_path: Some(PathBuf::from("x.wav")),
            ..ClipOutcome::skipped(window(), vec!["a.flac".into()], ClipStatus::Written)
        });
        assert_eq!(summary.total_windows, 2);
        assert_eq!(summary.written + summary.skipped, summary.total_windows);
        assert_eq!(summary.count(ClipStatus::MissingSource), 1);
        assert!((summary.rows[0].duration_secs - 90.0).abs() < f64::EPSILON);
    }
}
