//! WAV clip writing.
//!
//! Clips are streamed sample by sample into 16-bit PCM WAV files that keep
//! the source's rate and channel count.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter as HoundWriter};

use crate::audio::AudioInfo;
use crate::constants::clipper::OUTPUT_BITS_PER_SAMPLE;
use crate::coverage::TimeWindow;
use crate::error::{Error, Result};
use crate::utils::timestamp::format_stamp;

/// Streaming writer for one clip.
pub struct WavWriter {
    path: PathBuf,
    inner: HoundWriter<BufWriter<File>>,
    channels: u16,
    samples: u64,
}

impl WavWriter {
    /// Create (or truncate) `path` with the rate and channels of `format`.
    pub fn create(path: &Path, format: &AudioInfo) -> Result<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: OUTPUT_BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };
        let inner = HoundWriter::create(path, spec).map_err(|e| Error::WavWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            inner,
            channels: format.channels,
            samples: 0,
        })
    }

    /// Append interleaved samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.inner
                .write_sample(sample)
                .map_err(|e| Error::WavWriteFailed {
                    path: self.path.clone(),
                    source: e,
                })?;
        }
        self.samples += samples.len() as u64;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.samples / u64::from(self.channels.max(1))
    }

    /// Finish the header; returns frames written.
    pub fn finalize(self) -> Result<u64> {
        let frames = self.frames();
        self.inner.finalize().map_err(|e| Error::WavWriteFailed {
            path: self.path,
            source: e,
        })?;
        Ok(frames)
    }
}

/// Sanitize a string for use as a filename/directory name.
///
/// Replaces characters that are invalid in filenames across platforms
/// and prevents path traversal.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    sanitized.replace("..", "__")
}

/// Clip name for a window cut from `primary_name`.
///
/// Format: `<primary stem>__<start>_<end>.wav`
/// Example: `SanctSound_CI01_01_671379494_20210101T000000Z__20210101T003000_20210101T011500.wav`
pub fn clip_filename(primary_name: &str, window: &TimeWindow) -> String {
    let stem = Path::new(primary_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(primary_name);
    format!(
        "{}__{}_{}.wav",
        sanitize_filename(stem),
        format_stamp(&window.start),
        format_stamp(&window.end)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("ci01_dolphins"), "ci01_dolphins");
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_filename("../etc"), "___etc");
    }

    #[test]
    fn test_clip_filename() {
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 0, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 6, 1, 1, 15, 0).unwrap();
        let window = TimeWindow::new(start, end).unwrap();
        assert_eq!(
            clip_filename("rec_20210601T000000Z.flac", &window),
            "rec_20210601T000000Z__20210601T003000_20210601T011500.wav"
        );
    }

    #[test]
    fn test_writer_counts_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.wav");
        let format = AudioInfo {
            sample_rate: 8000,
            channels: 2,
            frames: 0,
        };
        let mut writer = WavWriter::create(&path, &format).unwrap();
        writer.write_samples(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(writer.finalize().unwrap(), 3);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.duration(), 3);
    }
}
