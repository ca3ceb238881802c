//! Detection rows extracted from tables.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::utils::timestamp::{self, TimeInstant};
use crate::windows::Mode;

use super::columns::{self, ColumnRoles};
use super::table::CsvTable;

/// One normalised detection record.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    /// Bin start (HOUR/DAY) or event start (EVENT).
    pub timestamp: TimeInstant,
    /// Rounded presence flag; `None` when the cell is not numeric.
    pub presence: Option<bool>,
    /// Event end, when an end column parses on this row.
    pub end: Option<TimeInstant>,
    /// Event duration in seconds, when a duration column parses.
    pub duration_secs: Option<f64>,
}

/// Read one detection CSV for `mode`.
///
/// # Errors
///
/// Fails when the file cannot be read as CSV or when the columns `mode`
/// needs cannot be detected.
pub fn read_detection_rows(path: &Path, mode: Mode) -> Result<Vec<DetectionRow>> {
    let table = CsvTable::read(path)?;
    let roles = columns::resolve_roles(&table, mode).map_err(|missing| Error::ColumnDetection {
        path: path.to_path_buf(),
        message: missing.describe(mode),
    })?;
    debug!(
        "{}: timestamp column {}, presence {:?}, end {:?}, duration {:?}",
        path.display(),
        roles.timestamp,
        roles.presence,
        roles.end,
        roles.duration
    );

    let (rows, skipped) = extract_rows(&table, &roles);
    if skipped > 0 {
        warn!(
            "{}: skipped {skipped} row(s) with unparseable timestamps",
            path.display()
        );
    }
    Ok(rows)
}

/// Extract rows using resolved roles; returns rows and the skip count.
pub fn extract_rows(table: &CsvTable, roles: &ColumnRoles) -> (Vec<DetectionRow>, usize) {
    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped = 0;

    for r in 0..table.rows.len() {
        let Some(ts) = timestamp::try_parse(table.cell(r, roles.timestamp)) else {
            skipped += 1;
            continue;
        };
        rows.push(DetectionRow {
            timestamp: ts,
            presence: roles
                .presence
                .and_then(|c| columns::parse_number(table.cell(r, c)))
                .map(|v| v.round() == 1.0),
            end: roles
                .end
                .and_then(|c| timestamp::try_parse(table.cell(r, c))),
            duration_secs: roles
                .duration
                .and_then(|c| columns::parse_number(table.cell(r, c))),
        });
    }

    (rows, skipped)
}

/// Read and concatenate rows from several files in order.
///
/// # Errors
///
/// The first file that fails aborts the read.
pub fn read_all_rows(paths: &[impl AsRef<Path>], mode: Mode) -> Result<Vec<DetectionRow>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(read_detection_rows(path.as_ref(), mode)?);
    }
    Ok(all)
}
