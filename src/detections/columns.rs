//! Column-role detection for unlabelled detection tables.
//!
//! Roles are decided from content first and header text second: a
//! timestamp column is whichever parses most often, a presence column is
//! the one that is overwhelmingly `0`/`1`. Header keywords only pick end
//! and duration columns and break presence ties.

use crate::constants::columns::{DURATION_HINTS, END_HINTS, PRESENCE_HINTS};
use crate::constants::windows::{
    DEFAULT_TIMESTAMP_FRACTION, HOUR_TIMESTAMP_FRACTION, MIN_TIMESTAMP_CELLS,
};
use crate::utils::timestamp;
use crate::windows::Mode;

use super::table::CsvTable;

/// Column indices for each role in one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Start or bin timestamp.
    pub timestamp: usize,
    /// Binary presence flag.
    pub presence: Option<usize>,
    /// Explicit event end.
    pub end: Option<usize>,
    /// Event duration in seconds.
    pub duration: Option<usize>,
}

/// Why roles could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRole {
    /// No column parsed often enough as a timestamp.
    Timestamp,
    /// No column looked like a 0/1 flag.
    Presence,
}

impl MissingRole {
    /// Human-readable description.
    pub fn describe(self, mode: Mode) -> String {
        match (self, mode) {
            (Self::Timestamp, Mode::Hour) => "could not detect hour column".to_string(),
            (Self::Timestamp, _) => "could not detect date/datetime column".to_string(),
            (Self::Presence, _) => "could not detect presence (0/1) column".to_string(),
        }
    }
}

/// Minimum parsed-cell fraction for a mode's timestamp column.
pub fn timestamp_fraction(mode: Mode) -> f64 {
    match mode {
        Mode::Hour => HOUR_TIMESTAMP_FRACTION,
        Mode::Day | Mode::Event => DEFAULT_TIMESTAMP_FRACTION,
    }
}

/// Resolve every role `mode` needs.
///
/// HOUR and DAY require a presence column; EVENT only a timestamp.
pub fn resolve_roles(table: &CsvTable, mode: Mode) -> Result<ColumnRoles, MissingRole> {
    let ts = detect_timestamp_column(table, timestamp_fraction(mode)).ok_or(MissingRole::Timestamp)?;

    let presence = match mode {
        Mode::Hour | Mode::Day => {
            Some(detect_presence_column(table, &[ts]).ok_or(MissingRole::Presence)?)
        }
        Mode::Event => None,
    };

    let (end, duration) = match mode {
        Mode::Event => {
            let end = detect_end_column(table, &[ts]);
            let skip: Vec<usize> = std::iter::once(ts).chain(end).collect();
            (end, detect_duration_column(table, &skip))
        }
        Mode::Hour | Mode::Day => (None, None),
    };

    Ok(ColumnRoles {
        timestamp: ts,
        presence,
        end,
        duration,
    })
}

/// The column with the most parseable timestamps.
///
/// Accepted only when its count reaches `max(3, ceil(rows * min_fraction))`.
/// Ties prefer a column whose header does not read as an end time, then the
/// leftmost.
pub fn detect_timestamp_column(table: &CsvTable, min_fraction: f64) -> Option<usize> {
    let counts: Vec<usize> = (0..table.column_count())
        .map(|c| {
            table
                .column(c)
                .filter(|cell| timestamp::try_parse(cell).is_some())
                .count()
        })
        .collect();

    let best = (0..counts.len()).max_by_key(|&c| {
        (
            counts[c],
            !has_hint(&table.header_lower(c), END_HINTS),
            std::cmp::Reverse(c),
        )
    })?;

    (counts[best] >= timestamp_threshold(table.rows.len(), min_fraction)).then_some(best)
}

/// `max(3, ceil(rows * fraction))`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn timestamp_threshold(rows: usize, fraction: f64) -> usize {
    let scaled = (rows as f64 * fraction).ceil().max(0.0) as usize;
    scaled.max(MIN_TIMESTAMP_CELLS)
}

/// Tallies of a column's numeric content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FlagStats {
    valid: usize,
    ones: usize,
    other_numeric: usize,
}

fn flag_stats<'a>(cells: impl Iterator<Item = &'a str>) -> FlagStats {
    let mut stats = FlagStats::default();
    for value in cells.filter_map(parse_number) {
        match value.round() {
            v if v == 0.0 => stats.valid += 1,
            v if v == 1.0 => {
                stats.valid += 1;
                stats.ones += 1;
            }
            _ => stats.other_numeric += 1,
        }
    }
    stats
}

/// The column that is overwhelmingly `0`/`1`, skipping `skip`.
///
/// A candidate needs at least one `1` and no more other numbers than half
/// its valid flags. Candidates rank by valid count, then by a header hint
/// such as "presence", then leftmost.
pub fn detect_presence_column(table: &CsvTable, skip: &[usize]) -> Option<usize> {
    (0..table.column_count())
        .filter(|c| !skip.contains(c))
        .filter_map(|c| {
            let stats = flag_stats(table.column(c));
            let plausible =
                stats.valid > 0 && stats.ones > 0 && stats.other_numeric * 2 <= stats.valid;
            plausible.then_some((c, stats.valid))
        })
        .max_by_key(|&(c, valid)| {
            (
                valid,
                has_hint(&table.header_lower(c), PRESENCE_HINTS),
                std::cmp::Reverse(c),
            )
        })
        .map(|(c, _)| c)
}

/// First column whose header reads as an end time and holds at least one
/// parseable timestamp.
pub fn detect_end_column(table: &CsvTable, skip: &[usize]) -> Option<usize> {
    (0..table.column_count())
        .filter(|c| !skip.contains(c))
        .filter(|&c| has_hint(&table.header_lower(c), END_HINTS))
        .find(|&c| table.column(c).any(|cell| timestamp::try_parse(cell).is_some()))
}

/// First column whose header reads as a duration.
pub fn detect_duration_column(table: &CsvTable, skip: &[usize]) -> Option<usize> {
    (0..table.column_count())
        .filter(|c| !skip.contains(c))
        .find(|&c| has_hint(&table.header_lower(c), DURATION_HINTS))
}

/// Parse a finite number.
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_hint(header: &str, hints: &[&str]) -> bool {
    hints.iter().any(|h| header.contains(h))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(text: &str) -> CsvTable {
        CsvTable::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_threshold_floor_and_fraction() {
        assert_eq!(timestamp_threshold(10, 0.1), 3);
        assert_eq!(timestamp_threshold(100, 0.1), 10);
        assert_eq!(timestamp_threshold(101, 0.05), 6);
        assert_eq!(timestamp_threshold(0, 0.5), 3);
    }

    #[test]
    fn test_timestamp_column_by_count() {
        let t = table(
            "id,when,flag\n\
             1,2021-01-01T00:00:00Z,0\n\
             2,2021-01-01T01:00:00Z,1\n\
             3,2021-01-01T02:00:00Z,1\n",
        );
        assert_eq!(detect_timestamp_column(&t, 0.1), Some(1));
    }

    #[test]
    fn test_timestamp_column_below_floor() {
        let t = table("when,flag\n2021-01-01,1\n2021-01-02,0\n");
        assert_eq!(detect_timestamp_column(&t, 0.05), None);
    }

    #[test]
    fn test_timestamp_tie_prefers_start_over_end() {
        let t = table(
            "End,Begin\n\
             2021-01-01T00:01:00Z,2021-01-01T00:00:00Z\n\
             2021-01-01T01:01:00Z,2021-01-01T01:00:00Z\n\
             2021-01-01T02:01:00Z,2021-01-01T02:00:00Z\n",
        );
        assert_eq!(detect_timestamp_column(&t, 0.05), Some(1));
    }

    #[test]
    fn test_presence_prefers_more_valid_then_hint() {
        let t = table(
            "time,quality,Presence,count\n\
             2021-01-01T00:00:00Z,1,1,5\n\
             2021-01-01T01:00:00Z,0,0,7\n\
             2021-01-01T02:00:00Z,1,1,2\n",
        );
        assert_eq!(detect_presence_column(&t, &[0]), Some(2));
    }

    #[test]
    fn test_presence_rejects_all_zero_and_mostly_numeric() {
        let t = table(
            "time,zeros,counts\n\
             2021-01-01T00:00:00Z,0,1\n\
             2021-01-01T01:00:00Z,0,4\n\
             2021-01-01T02:00:00Z,0,9\n",
        );
        assert_eq!(detect_presence_column(&t, &[0]), None);
    }

    #[test]
    fn test_presence_tolerates_rounding_and_text() {
        let t = table(
            "time,flag\n\
             2021-01-01T00:00:00Z,0.9\n\
             2021-01-01T01:00:00Z,NA\n\
             2021-01-01T02:00:00Z,0.1\n",
        );
        assert_eq!(detect_presence_column(&t, &[0]), Some(1));
    }

    #[test]
    fn test_event_roles() {
        let t = table(
            "Start,Stop,Duration_s,label\n\
             2021-01-01T00:00:00Z,2021-01-01T00:00:30Z,30,a\n\
             2021-01-01T01:00:00Z,,12,b\n\
             2021-01-01T02:00:00Z,2021-01-01T02:00:05Z,,c\n",
        );
        let roles = resolve_roles(&t, Mode::Event).unwrap();
        assert_eq!(roles.timestamp, 0);
        assert_eq!(roles.end, Some(1));
        assert_eq!(roles.duration, Some(2));
        assert_eq!(roles.presence, None);
    }

    #[test]
    fn test_hour_roles_require_presence() {
        let t = table(
            "hour,label\n\
             2021-01-01T00:00:00Z,a\n\
             2021-01-01T01:00:00Z,b\n\
             2021-01-01T02:00:00Z,c\n",
        );
        assert_eq!(resolve_roles(&t, Mode::Hour), Err(MissingRole::Presence));
        assert_eq!(
            MissingRole::Presence.describe(Mode::Hour),
            "could not detect presence (0/1) column"
        );
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }
}
