//! Clip manifest and summary files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::clipper::{ClipOutcome, ClipSummary};
use crate::constants::clipper::{MANIFEST_FILE, SOURCE_SEPARATOR, SUMMARY_FILE};
use crate::error::{Error, Result};
use crate::utils::timestamp::format_iso;
use crate::windows::Mode;

/// Manifest column names.
pub const MANIFEST_HEADER: &str = "clip_wav,source_flac(s),start_utc,end_utc,duration_sec,mode,status";

/// Writes `clips_manifest.csv`, one row per window.
pub struct ManifestWriter {
    writer: BufWriter<File>,
    mode: Mode,
}

impl ManifestWriter {
    /// Create the manifest in `dir` and write the header.
    pub fn create(dir: &Path, mode: Mode) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let file = File::create(&path).map_err(|source| Error::FileCreate { path, source })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{MANIFEST_HEADER}")?;
        Ok(Self { writer, mode })
    }

    /// Append one outcome.
    pub fn write_row(&mut self, row: &ClipOutcome) -> Result<()> {
        let clip = row
            .clip_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(
            self.writer,
            "{},{},{},{},{:.3},{},{}",
            escape_csv(&clip),
            escape_csv(&row.source_names.join(SOURCE_SEPARATOR)),
            format_iso(&row.window.start),
            format_iso(&row.window.end),
            row.duration_secs,
            self.mode,
            row.status,
        )?;
        Ok(())
    }

    /// Flush to disk.
    pub fn finalize(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write the manifest for a whole summary; returns its path.
pub fn write_manifest(dir: &Path, mode: Mode, summary: &ClipSummary) -> Result<PathBuf> {
    let mut writer = ManifestWriter::create(dir, mode)?;
    for row in &summary.rows {
        writer.write_row(row)?;
    }
    writer.finalize()?;
    Ok(dir.join(MANIFEST_FILE))
}

/// Summary text for a group.
pub fn summary_text(summary: &ClipSummary, mode: Mode, dir: &Path) -> String {
    format!(
        "Windows: {} | Clips: {} | Skipped: {} | Mode: {mode}\nDir: {}\n",
        summary.total_windows,
        summary.written,
        summary.skipped,
        dir.display()
    )
}

/// Write `clips_summary.txt`; returns its path.
pub fn write_summary(dir: &Path, mode: Mode, summary: &ClipSummary) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, summary_text(summary, mode, dir)).map_err(|source| {
        Error::FileCreate {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}

/// Escape a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
