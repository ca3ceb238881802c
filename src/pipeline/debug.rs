//! Optional trace files written alongside a preview.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::constants::debug_files;

/// A named trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugChannel {
    /// Per-deployment listing counts.
    FolderListings,
    /// Every recording considered, as URLs.
    CandidateUrls,
    /// Every recording considered, as basenames.
    CandidateNames,
    /// Minimal selection, as URLs.
    SelectedUrls,
    /// Minimal selection, as basenames.
    SelectedNames,
    /// One line per window explaining its cover.
    Explain,
    /// Windows as TSV.
    Windows,
    /// Expected vs selected diff.
    ExpectedVsSelected,
}

impl DebugChannel {
    /// File name used by [`DirSink`].
    pub fn file_name(self) -> &'static str {
        match self {
            Self::FolderListings => debug_files::FOLDER_LISTINGS,
            Self::CandidateUrls => debug_files::CANDIDATE_URLS,
            Self::CandidateNames => debug_files::CANDIDATE_NAMES,
            Self::SelectedUrls => debug_files::SELECTED_URLS,
            Self::SelectedNames => debug_files::SELECTED_NAMES,
            Self::Explain => debug_files::EXPLAIN,
            Self::Windows => debug_files::WINDOWS_TSV,
            Self::ExpectedVsSelected => debug_files::EXPECTED_VS_SELECTED,
        }
    }
}

/// Side channel for trace output, passed into pipeline calls.
///
/// Failures are never fatal to the caller.
pub trait DebugSink {
    /// Append one line to `channel`.
    fn append_line(&self, channel: DebugChannel, line: &str);

    /// Replace `channel`'s content with `lines`.
    fn overwrite_lines(&self, channel: DebugChannel, lines: &[String]);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn append_line(&self, _channel: DebugChannel, _line: &str) {}

    fn overwrite_lines(&self, _channel: DebugChannel, _lines: &[String]) {}
}

/// Writes each channel to a file in one directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    /// Sink rooted at `dir`, created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the files go to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `channel`'s file.
    pub fn path_for(&self, channel: DebugChannel) -> PathBuf {
        self.dir.join(channel.file_name())
    }

    fn try_append(&self, channel: DebugChannel, line: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(channel))?;
        writeln!(file, "{line}")
    }

    fn try_overwrite(&self, channel: DebugChannel, lines: &[String]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(self.path_for(channel), text)
    }
}

impl DebugSink for DirSink {
    fn append_line(&self, channel: DebugChannel, line: &str) {
        if let Err(e) = self.try_append(channel, line) {
            warn!("debug output {} not written: {e}", self.path_for(channel).display());
        }
    }

    fn overwrite_lines(&self, channel: DebugChannel, lines: &[String]) {
        if let Err(e) = self.try_overwrite(channel, lines) {
            warn!("debug output {} not written: {e}", self.path_for(channel).display());
        }
    }
}
