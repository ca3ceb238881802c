//! Compare a preview's selection against a hand-made list of expected files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::basename_of;

use super::debug::{DebugChannel, DebugSink};

/// Set difference between expected and selected basenames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    /// Expected but not selected.
    pub missing: BTreeSet<String>,
    /// Selected but not expected.
    pub unexpected: BTreeSet<String>,
}

impl Verification {
    /// Compare two name lists; URLs are reduced to basenames.
    pub fn compare<E, S>(expected: E, selected: S) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let expected: BTreeSet<String> = expected
            .into_iter()
            .map(|s| basename_of(s.as_ref().trim()).to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let selected: BTreeSet<String> = selected
            .into_iter()
            .map(|s| basename_of(s.as_ref()).to_string())
            .collect();
        Self {
            missing: expected.difference(&selected).cloned().collect(),
            unexpected: selected.difference(&expected).cloned().collect(),
        }
    }

    /// Both sets empty.
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }

    /// The two report lines.
    pub fn report_lines(&self) -> Vec<String> {
        vec![
            format!("MISSING_FROM_SELECTED={}", join_or_dash(&self.missing)),
            format!("UNEXPECTED_IN_SELECTED={}", join_or_dash(&self.unexpected)),
        ]
    }
}

fn join_or_dash(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "-".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Trimmed, non-empty lines of an expected-files list.
pub fn read_expected(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| Error::ExpectedListRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Write the report through `sink` and turn a mismatch into an error.
///
/// `report` is the path the sink writes to, used in the error message.
pub fn verify_selection(
    expected: &[String],
    selected: &[String],
    sink: &dyn DebugSink,
    report: PathBuf,
) -> Result<Verification> {
    let verification = Verification::compare(expected, selected);
    sink.overwrite_lines(DebugChannel::ExpectedVsSelected, &verification.report_lines());

    if verification.passed() {
        info!("Verification passed ({} file(s))", expected.len());
        return Ok(verification);
    }
    for name in &verification.missing {
        warn!("expected but not selected: {name}");
    }
    for name in &verification.unexpected {
        warn!("selected but not expected: {name}");
    }
    Err(Error::VerificationFailed {
        missing: verification.missing.len(),
        unexpected: verification.unexpected.len(),
        report,
    })
}
