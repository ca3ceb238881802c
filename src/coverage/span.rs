//! Recording spans and time windows.

use std::collections::HashMap;

use chrono::TimeDelta;
use serde::Serialize;

use crate::constants::matching::MIN_SPAN_MILLIS;
use crate::utils::TimeInstant;

/// A `[start, end)` range in which a detection was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeWindow {
    /// Inclusive start.
    pub start: TimeInstant,
    /// Exclusive end, always after `start`.
    pub end: TimeInstant,
}

impl TimeWindow {
    /// Create a window, rejecting empty or inverted ranges.
    pub fn new(start: TimeInstant, end: TimeInstant) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Window length.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Window length in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 1000.0
    }
}

/// The time range covered by one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSpan {
    /// Where the recording can be fetched from (a `gs://` URL or local path).
    pub url: String,
    /// File name of the recording.
    pub basename: String,
    /// Deployment folder the recording belongs to.
    pub deployment: String,
    /// Start decoded from the file name.
    pub start: TimeInstant,
    /// Inferred end.
    pub end: TimeInstant,
}

impl AudioSpan {
    /// Whether the span contains `window` entirely.
    pub fn covers(&self, window: &TimeWindow) -> bool {
        self.start <= window.start && self.end >= window.end
    }
}

impl AsRef<Self> for AudioSpan {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Order spans by `(start, deployment)`, the order the matcher expects.
pub fn sort_spans<T: AsRef<AudioSpan>>(spans: &mut [T]) {
    spans.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        a.start
            .cmp(&b.start)
            .then_with(|| a.deployment.cmp(&b.deployment))
    });
}

/// Derive each span's end from the next start in the same deployment.
///
/// Spans must already be sorted by start. A following span that starts at
/// the same instant clamps the end to one second after start; the last span
/// of each deployment gets `default_span`.
pub fn assign_span_ends(spans: &mut [AudioSpan], default_span: TimeDelta) {
    let mut next_start: HashMap<String, TimeInstant> = HashMap::new();

    for span in spans.iter_mut().rev() {
        span.end = match next_start.get(&span.deployment) {
            Some(&next) if next > span.start => next,
            Some(_) => span.start + TimeDelta::milliseconds(MIN_SPAN_MILLIS),
            None => span.start + default_span,
        };
        next_start.insert(span.deployment.clone(), span.start);
    }
}
