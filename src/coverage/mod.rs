//! Recording spans and the window coverage matcher.

pub mod matcher;
pub mod span;

pub use matcher::{Cover, CoverageReport, CoverageSelection, WindowCover, cover_window, match_windows};
pub use span::{AudioSpan, TimeWindow, assign_span_ends, sort_spans};
