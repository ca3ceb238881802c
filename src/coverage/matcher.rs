//! Window to recording coverage.
//!
//! Each window is resolved against a timeline of spans sorted by
//! `(start, deployment)`: the primary span is the latest one starting at or
//! before the window, and the span right after it is pulled in when the
//! window runs past the primary's end. Anything else is unmatched, never
//! silently truncated.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::span::{AudioSpan, TimeWindow};

/// How one window is covered, as indices into the span timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cover {
    /// One span contains the whole window.
    Single(usize),
    /// The window starts in the first span and finishes in the second.
    Spliced(usize, usize),
    /// No span, or pair of spans, covers the window.
    Unmatched,
}

impl Cover {
    /// Span indices used, primary first.
    pub fn indices(&self) -> Vec<usize> {
        match *self {
            Self::Single(i) => vec![i],
            Self::Spliced(i, j) => vec![i, j],
            Self::Unmatched => Vec::new(),
        }
    }

    /// Whether the window was matched.
    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched)
    }
}

/// A window with its cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowCover {
    /// The requested window.
    pub window: TimeWindow,
    /// Spans that realise it.
    pub cover: Cover,
}

/// Minimal set of recordings needed for a window list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSelection {
    /// Recording URLs in timeline order.
    pub urls: Vec<String>,
    /// Basenames, parallel to `urls`.
    pub basenames: Vec<String>,
}

impl CoverageSelection {
    /// Number of selected recordings.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Per-window covers plus the union of spans they use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// One entry per input window, in input order.
    pub covers: Vec<WindowCover>,
    /// Timeline indices of every span used, ascending and unique.
    pub used: Vec<usize>,
    /// URLs and basenames of the used spans.
    pub selection: CoverageSelection,
}

impl CoverageReport {
    /// Windows that matched one or two spans.
    pub fn matched_count(&self) -> usize {
        self.covers.iter().filter(|c| c.cover.is_matched()).count()
    }

    /// Windows nothing covers.
    pub fn unmatched(&self) -> impl Iterator<Item = &TimeWindow> {
        self.covers
            .iter()
            .filter(|c| !c.cover.is_matched())
            .map(|c| &c.window)
    }
}

/// Resolve one window against a sorted span timeline.
pub fn cover_window<T: AsRef<AudioSpan>>(spans: &[T], window: &TimeWindow) -> Cover {
    let after = spans.partition_point(|s| s.as_ref().start <= window.start);
    let Some(primary_idx) = after.checked_sub(1) else {
        return Cover::Unmatched;
    };
    let primary = spans[primary_idx].as_ref();
    if primary.end >= window.end {
        return Cover::Single(primary_idx);
    }

    let next: Option<&AudioSpan> = spans.get(primary_idx + 1).map(AsRef::as_ref);
    match next {
        Some(next) if next.start <= primary.end && next.end >= window.end => {
            Cover::Spliced(primary_idx, primary_idx + 1)
        }
        _ => Cover::Unmatched,
    }
}

/// Resolve every window and take the union of the spans used.
///
/// `spans` must be sorted by `(start, deployment)`.
pub fn match_windows<T: AsRef<AudioSpan>>(spans: &[T], windows: &[TimeWindow]) -> CoverageReport {
    let covers: Vec<WindowCover> = windows
        .iter()
        .map(|w| WindowCover {
            window: *w,
            cover: cover_window(spans, w),
        })
        .collect();

    let used: BTreeSet<usize> = covers.iter().flat_map(|c| c.cover.indices()).collect();
    let used: Vec<usize> = used.into_iter().collect();

    let mut seen = HashSet::new();
    let mut selection = CoverageSelection::default();
    for &i in &used {
        let span = spans[i].as_ref();
        if seen.insert(span.url.as_str()) {
            selection.urls.push(span.url.clone());
            selection.basenames.push(span.basename.clone());
        }
    }

    CoverageReport {
        covers,
        used,
        selection,
    }
}
