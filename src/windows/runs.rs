//! Runs of consecutive presence bins.

use chrono::TimeDelta;
use serde::Serialize;

use crate::constants::windows::RUN_GAP_TOLERANCE_MILLIS;
use crate::coverage::TimeWindow;
use crate::utils::TimeInstant;

/// A maximal sequence of bins spaced exactly one step apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Run {
    /// Start of the first bin.
    pub first: TimeInstant,
    /// Start of the last bin.
    pub last: TimeInstant,
    /// Number of bins.
    pub bins: usize,
}

impl Run {
    /// Covered range `[first, last + step)`.
    pub fn span(&self, step: TimeDelta) -> Option<TimeWindow> {
        TimeWindow::new(self.first, self.last + step)
    }
}

/// Group sorted, unique bin starts into runs.
///
/// Two bins belong to the same run when their gap is `step` within a
/// millisecond.
pub fn group_runs(bins: &[TimeInstant], step: TimeDelta) -> Vec<Run> {
    let tolerance = TimeDelta::milliseconds(RUN_GAP_TOLERANCE_MILLIS);
    let mut runs: Vec<Run> = Vec::new();

    for &bin in bins {
        match runs.last_mut() {
            Some(run) if ((bin - run.last) - step).abs() <= tolerance => {
                run.last = bin;
                run.bins += 1;
            }
            _ => runs.push(Run {
                first: bin,
                last: bin,
                bins: 1,
            }),
        }
    }

    runs
}

/// Expand runs back into one window per bin.
pub fn expand_runs(runs: &[Run], step: TimeDelta) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    for run in runs {
        let mut start = run.first;
        for _ in 0..run.bins {
            if let Some(w) = TimeWindow::new(start, start + step) {
                windows.push(w);
            }
            start += step;
        }
    }
    windows
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn hour(h: u32) -> TimeInstant {
        Utc.with_ymd_and_hms(2021, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_group_runs_splits_on_gaps() {
        let bins = [hour(3), hour(4), hour(5), hour(8)];
        let runs = group_runs(&bins, TimeDelta::hours(1));
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].first, runs[0].last, runs[0].bins), (hour(3), hour(5), 3));
        assert_eq!((runs[1].first, runs[1].bins), (hour(8), 1));
        assert_eq!(
            runs[0].span(TimeDelta::hours(1)).unwrap(),
            TimeWindow::new(hour(3), hour(6)).unwrap()
        );
    }

    #[test]
    fn test_group_runs_tolerates_millisecond_jitter() {
        let bins = [hour(1), hour(2) + TimeDelta::milliseconds(1)];
        assert_eq!(group_runs(&bins, TimeDelta::hours(1)).len(), 1);
        let bins = [hour(1), hour(2) + TimeDelta::milliseconds(2)];
        assert_eq!(group_runs(&bins, TimeDelta::hours(1)).len(), 2);
    }

    #[test]
    fn test_expand_runs_restores_bins() {
        let runs = group_runs(&[hour(3), hour(4)], TimeDelta::hours(1));
        let windows = expand_runs(&runs, TimeDelta::hours(1));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].start, hour(4));
        assert_eq!(windows[1].end, hour(5));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_runs(&[], TimeDelta::hours(1)).is_empty());
    }
}
