//! Detection rows to time windows.

use chrono::TimeDelta;
use serde::Serialize;
use tracing::debug;

use crate::config::WindowsConfig;
use crate::coverage::TimeWindow;
use crate::detections::DetectionRow;
use crate::utils::TimeInstant;
use crate::utils::timestamp::{truncate_to_day, truncate_to_hour};

use super::Mode;
use super::runs::{Run, expand_runs, group_runs};

/// Knobs for window construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowOptions {
    /// EVENT length when neither end nor a positive duration is known.
    pub event_fallback: TimeDelta,
    /// Drop HOUR runs with fewer bins than this.
    pub min_run_hours: Option<u32>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self::from(&WindowsConfig::default())
    }
}

impl From<&WindowsConfig> for WindowOptions {
    fn from(config: &WindowsConfig) -> Self {
        Self {
            event_fallback: seconds_delta(config.event_fallback_secs)
                .unwrap_or_else(|| TimeDelta::seconds(60)),
            min_run_hours: config.only_long_runs.then_some(config.min_run_hours),
        }
    }
}

/// Windows built for one product group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowPlan {
    /// Granularity the windows were built for.
    pub mode: Mode,
    /// Sorted, unique windows.
    pub windows: Vec<TimeWindow>,
    /// Presence runs that survived filtering (HOUR and DAY only).
    pub runs: Vec<Run>,
}

impl WindowPlan {
    /// `(earliest start, latest end)` over all windows.
    pub fn bounds(&self) -> Option<(TimeInstant, TimeInstant)> {
        let start = self.windows.iter().map(|w| w.start).min()?;
        let end = self.windows.iter().map(|w| w.end).max()?;
        Some((start, end))
    }

    /// Whether no window was produced.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Single entry point from rows to windows for every mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowBuilder {
    options: WindowOptions,
}

impl WindowBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(options: WindowOptions) -> Self {
        Self { options }
    }

    /// Build windows from rows merged across every source file.
    pub fn build(&self, mode: Mode, rows: &[DetectionRow]) -> WindowPlan {
        let plan = match mode {
            Mode::Hour => self.presence_windows(mode, rows, TimeDelta::hours(1), truncate_to_hour),
            Mode::Day => self.presence_windows(mode, rows, TimeDelta::days(1), truncate_to_day),
            Mode::Event => WindowPlan {
                mode,
                windows: self.event_windows(rows),
                runs: Vec::new(),
            },
        };
        debug!(
            "{mode}: {} row(s) -> {} window(s), {} run(s)",
            rows.len(),
            plan.windows.len(),
            plan.runs.len()
        );
        plan
    }

    fn presence_windows(
        &self,
        mode: Mode,
        rows: &[DetectionRow],
        step: TimeDelta,
        truncate: fn(&TimeInstant) -> TimeInstant,
    ) -> WindowPlan {
        let mut bins: Vec<TimeInstant> = rows
            .iter()
            .filter(|r| r.presence == Some(true))
            .map(|r| truncate(&r.timestamp))
            .collect();
        bins.sort_unstable();
        bins.dedup();

        let mut runs = group_runs(&bins, step);
        if mode == Mode::Hour
            && let Some(min) = self.options.min_run_hours
        {
            runs.retain(|run| run.bins >= min as usize);
        }

        WindowPlan {
            mode,
            windows: expand_runs(&runs, step),
            runs,
        }
    }

    fn event_windows(&self, rows: &[DetectionRow]) -> Vec<TimeWindow> {
        let mut windows: Vec<TimeWindow> = rows
            .iter()
            .filter_map(|row| TimeWindow::new(row.timestamp, self.event_end(row)?))
            .collect();
        windows.sort_unstable();
        windows.dedup();
        windows
    }

    fn event_end(&self, row: &DetectionRow) -> Option<TimeInstant> {
        if let Some(end) = row.end
            && end > row.timestamp
        {
            return Some(end);
        }
        let length = row
            .duration_secs
            .and_then(seconds_delta)
            .unwrap_or(self.options.event_fallback);
        row.timestamp.checked_add_signed(length)
    }
}

/// Positive seconds as a millisecond-precision delta.
#[allow(clippy::cast_possible_truncation)]
fn seconds_delta(secs: f64) -> Option<TimeDelta> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    TimeDelta::try_milliseconds((secs * 1000.0).round() as i64)
        .filter(|d| *d > TimeDelta::zero())
}
