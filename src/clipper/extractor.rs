//! Per-window clip extraction.
//!
//! A window resolved to one recording is cut directly; a window resolved to
//! two is realised as the tail of the first followed by the head of the
//! second. Every path ends in exactly one [`ClipStatus`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::audio::{AudioInfo, FrameReader, probe_audio};
use crate::config::{ClipBackend, ClipsConfig};
use crate::coverage::{AudioSpan, Cover, TimeWindow, WindowCover};
use crate::error::{Error, Result};
use crate::media::{Ffmpeg, ProbedStream};
use crate::utils::timestamp::format_iso;

use super::status::{ClipFailure, ClipOutcome, ClipStatus};
use super::writer::{WavWriter, clip_filename};

/// A downloaded recording with its probed span.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecording {
    /// Span with `url` set to the local path and `end` from the probe.
    pub span: AudioSpan,
    /// Local file.
    pub path: PathBuf,
    /// Stream parameters from the direct probe, else from ffprobe.
    pub info: Option<AudioInfo>,
}

impl LocalRecording {
    /// Recording length in seconds: probed frames when known, else span.
    #[allow(clippy::cast_precision_loss)]
    pub fn length_secs(&self) -> f64 {
        self.info.map_or_else(
            || (self.span.end - self.span.start).num_milliseconds() as f64 / 1000.0,
            |info| info.duration_secs(),
        )
    }
}

impl AsRef<AudioSpan> for LocalRecording {
    fn as_ref(&self) -> &AudioSpan {
        &self.span
    }
}

/// Produces clip audio from source recordings.
///
/// Implementations return the actual clip length in seconds.
pub trait SegmentCutter {
    /// Cut `[offset, offset + duration)` of one recording.
    fn cut(
        &self,
        source: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure>;

    /// Tail of `primary` from `offset` followed by the head of `secondary`,
    /// `duration` in total.
    fn splice(
        &self,
        primary: &LocalRecording,
        secondary: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure>;
}

/// Resolves windows to clips and classifies the result.
pub struct ClipExtractor {
    cutter: Box<dyn SegmentCutter>,
    min_clip_bytes: u64,
}

impl ClipExtractor {
    /// Extractor over any cutter.
    #[must_use]
    pub fn new(cutter: Box<dyn SegmentCutter>, min_clip_bytes: u64) -> Self {
        Self {
            cutter,
            min_clip_bytes,
        }
    }

    /// Extractor for the configured backend.
    #[must_use]
    pub fn from_config(config: &ClipsConfig) -> Self {
        let cutter: Box<dyn SegmentCutter> = match config.backend {
            ClipBackend::Native => Box::new(NativeCutter),
            ClipBackend::Ffmpeg => Box::new(FfmpegCutter::new(Ffmpeg::new(
                config.ffmpeg.clone(),
                config.tool_timeout(),
            ))),
        };
        Self::new(cutter, config.min_clip_bytes)
    }

    /// Produce the clip for one window into `clips_dir`.
    pub fn extract(
        &self,
        cover: &WindowCover,
        recordings: &[LocalRecording],
        clips_dir: &Path,
    ) -> ClipOutcome {
        let window = cover.window;
        let (primary, secondary) = match cover.cover {
            Cover::Single(i) => (recordings.get(i), None),
            Cover::Spliced(i, j) => (recordings.get(i), recordings.get(j)),
            Cover::Unmatched => (None, None),
        };
        let Some(primary) = primary else {
            debug!("{}: no covering recording", describe(&window));
            return ClipOutcome::skipped(window, Vec::new(), ClipStatus::MissingSource);
        };

        let mut sources = vec![primary.span.basename.clone()];
        if let Some(secondary) = secondary {
            sources.push(secondary.span.basename.clone());
        }

        let offset_secs = offset_secs(&window, &primary.span);
        if offset_secs >= primary.length_secs() {
            return ClipOutcome::skipped(window, sources, ClipStatus::StartOutOfBounds);
        }

        let output = clips_dir.join(clip_filename(&primary.span.basename, &window));
        let duration_secs = window.duration_secs();

        let result = if primary.span.end >= window.end {
            sources.truncate(1);
            self.cutter.cut(primary, offset_secs, duration_secs, &output)
        } else {
            match secondary {
                Some(secondary) if secondary.span.end >= window.end => {
                    self.cutter
                        .splice(primary, secondary, offset_secs, duration_secs, &output)
                }
                _ => {
                    debug!("{}: second recording does not reach the end", describe(&window));
                    return ClipOutcome::skipped(window, sources, ClipStatus::MissingSource);
                }
            }
        };

        let actual_secs = match result {
            Ok(secs) => secs,
            Err(failure) => {
                warn!("{}: {} ({})", describe(&window), failure.status, failure.error);
                remove_partial(&output);
                return ClipOutcome::skipped(window, sources, failure.status);
            }
        };

        if let Some(status) = self.validate(&output) {
            warn!("{}: {status} ({})", describe(&window), output.display());
            remove_partial(&output);
            return ClipOutcome::skipped(window, sources, status);
        }

        ClipOutcome {
            window,
            source_names: sources,
            status: ClipStatus::Written,
            clip_path: Some(output),
            duration_secs: actual_secs,
        }
    }

    fn validate(&self, output: &Path) -> Option<ClipStatus> {
        match fs::metadata(output) {
            Ok(meta) if meta.len() == 0 => Some(ClipStatus::NoAudio),
            Ok(meta) if meta.len() < self.min_clip_bytes => Some(ClipStatus::TooSmall),
            Ok(_) => None,
            Err(_) => Some(ClipStatus::NoAudio),
        }
    }
}

/// Cuts with symphonia decode and hound write, sample-exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCutter;

impl NativeCutter {
    fn open(source: &LocalRecording) -> std::result::Result<FrameReader, ClipFailure> {
        FrameReader::open(&source.path).map_err(|e| ClipFailure::new(ClipStatus::CutFailed, e))
    }
}

impl SegmentCutter for NativeCutter {
    fn cut(
        &self,
        source: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure> {
        let mut reader = Self::open(source)?;
        let format = reader.info();
        let offset = secs_to_frames(offset_secs, format.sample_rate);
        let total = secs_to_frames(duration_secs, format.sample_rate);
        if total == 0 {
            return Err(invalid_window(output));
        }

        let cut_failed = |e| ClipFailure::new(ClipStatus::CutFailed, e);
        reader.seek(offset).map_err(cut_failed)?;
        let mut writer = WavWriter::create(output, &format).map_err(cut_failed)?;
        reader
            .read_frames(total, |s| writer.write_samples(s))
            .map_err(cut_failed)?;
        let frames = writer.finalize().map_err(cut_failed)?;
        Ok(frames_to_secs(frames, format.sample_rate))
    }

    fn splice(
        &self,
        primary: &LocalRecording,
        secondary: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure> {
        let mut first = Self::open(primary)?;
        let mut second = Self::open(secondary)?;
        let format = first.info();
        check_formats(primary, &format, secondary, &second.info())?;

        let primary_frames = primary.info.map_or(format.frames, |i| i.frames);
        let offset = secs_to_frames(offset_secs, format.sample_rate);
        let total = secs_to_frames(duration_secs, format.sample_rate);
        if total == 0 {
            return Err(invalid_window(output));
        }
        let tail = primary_frames.saturating_sub(offset).min(total);
        let head = total - tail;
        debug!(
            "splice {} [{offset}, +{tail}) + {} [0, {head})",
            primary.span.basename, secondary.span.basename
        );

        let cut_failed = |e| ClipFailure::new(ClipStatus::CutFailed, e);
        let concat_failed = |e| ClipFailure::new(ClipStatus::ConcatFailed, e);

        first.seek(offset).map_err(cut_failed)?;
        let mut writer = WavWriter::create(output, &format).map_err(cut_failed)?;
        first
            .read_frames(tail, |s| writer.write_samples(s))
            .map_err(cut_failed)?;
        second
            .read_frames(head, |s| writer.write_samples(s))
            .map_err(concat_failed)?;
        let frames = writer.finalize().map_err(concat_failed)?;
        Ok(frames_to_secs(frames, format.sample_rate))
    }
}

/// Cuts with `ffmpeg -ss/-t` and joins with the concat demuxer.
#[derive(Debug, Clone)]
pub struct FfmpegCutter {
    ffmpeg: Ffmpeg,
}

impl FfmpegCutter {
    /// Cutter over an ffmpeg wrapper.
    #[must_use]
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }

    fn measured_secs(output: &Path, requested: f64) -> f64 {
        probe_audio(output).map_or(requested, |info| info.duration_secs())
    }
}

impl SegmentCutter for FfmpegCutter {
    fn cut(
        &self,
        source: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure> {
        self.ffmpeg
            .cut(&source.path, offset_secs, Some(duration_secs), output)
            .map_err(|e| ClipFailure::new(ClipStatus::CutFailed, e))?;
        Ok(Self::measured_secs(output, duration_secs))
    }

    fn splice(
        &self,
        primary: &LocalRecording,
        secondary: &LocalRecording,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> std::result::Result<f64, ClipFailure> {
        let a = known_format(primary)?;
        let b = known_format(secondary)?;
        check_formats(primary, &a, secondary, &b)?;

        let head_secs = duration_secs - (a.duration_secs() - offset_secs);
        let part1 = sibling(output, "part1.wav");
        let part2 = sibling(output, "part2.wav");
        let list = sibling(output, "concat.txt");

        let result = (|| {
            self.ffmpeg
                .cut(&primary.path, offset_secs, None, &part1)
                .map_err(|e| ClipFailure::new(ClipStatus::CutFailed, e))?;
            self.ffmpeg
                .cut(&secondary.path, 0.0, Some(head_secs.max(0.0)), &part2)
                .map_err(|e| ClipFailure::new(ClipStatus::CutFailed, e))?;
            self.ffmpeg
                .concat(&[part1.as_path(), part2.as_path()], &list, output)
                .map_err(|e| ClipFailure::new(ClipStatus::ConcatFailed, e))
        })();

        for temp in [&part1, &part2, &list] {
            remove_partial(temp);
        }
        result?;
        Ok(Self::measured_secs(output, duration_secs))
    }
}

fn known_format(source: &LocalRecording) -> std::result::Result<AudioInfo, ClipFailure> {
    source.info.ok_or_else(|| {
        ClipFailure::new(
            ClipStatus::FormatMismatch,
            Error::FormatUnknown {
                name: source.span.basename.clone(),
            },
        )
    })
}

fn check_formats(
    primary: &LocalRecording,
    a: &AudioInfo,
    secondary: &LocalRecording,
    b: &AudioInfo,
) -> std::result::Result<(), ClipFailure> {
    if a.same_format(b) {
        return Ok(());
    }
    Err(ClipFailure::new(
        ClipStatus::FormatMismatch,
        Error::FormatMismatch {
            primary: primary.span.basename.clone(),
            primary_rate: a.sample_rate,
            primary_channels: a.channels,
            secondary: secondary.span.basename.clone(),
            secondary_rate: b.sample_rate,
            secondary_channels: b.channels,
        },
    ))
}

fn invalid_window(output: &Path) -> ClipFailure {
    ClipFailure::new(
        ClipStatus::InvalidWindow,
        Error::Internal {
            message: format!("window for {} is shorter than one sample", output.display()),
        },
    )
}

/// Seconds from the recording start to the window start, floored at zero.
#[allow(clippy::cast_precision_loss)]
fn offset_secs(window: &TimeWindow, span: &AudioSpan) -> f64 {
    ((window.start - span.start).num_milliseconds().max(0)) as f64 / 1000.0
}

/// `round(secs * rate)`, zero for non-positive input.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * f64::from(sample_rate)).round() as u64
}

#[allow(clippy::cast_precision_loss)]
fn frames_to_secs(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / f64::from(sample_rate)
}

fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}.{suffix}"))
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        warn!("failed to remove partial output {}: {e}", path.display());
    }
}

fn describe(window: &TimeWindow) -> String {
    format!("[{} .. {})", format_iso(&window.start), format_iso(&window.end))
}

/// Probe a downloaded file into a [`LocalRecording`].
///
/// `start` comes from the file name; `end` is start plus the probed
/// length. When the direct probe fails, `fallback` (ffprobe) supplies
/// length and format; failing that the length is `fallback_secs` and the
/// format stays unknown.
pub fn local_recording(
    path: &Path,
    span: AudioSpan,
    fallback: impl FnOnce(&Path) -> Option<ProbedStream>,
    fallback_secs: f64,
) -> Result<LocalRecording> {
    let direct = match probe_audio(path) {
        Ok(info) => Some(info),
        Err(e) => {
            debug!("{}: direct probe failed: {e}", path.display());
            None
        }
    };
    let (info, length) = match direct.filter(|i| i.duration_secs() > 0.0) {
        Some(info) => (Some(info), info.duration_secs()),
        None => match fallback(path) {
            Some(stream) => (stream.audio_info().or(direct), stream.duration_secs),
            None => (direct, fallback_secs),
        },
    };

    #[allow(clippy::cast_possible_truncation)]
    let length = chrono::TimeDelta::try_milliseconds((length * 1000.0).round() as i64)
        .ok_or_else(|| Error::Internal {
            message: format!("recording length out of range: {}", path.display()),
        })?;

    let end = span.start + length;
    Ok(LocalRecording {
        span: AudioSpan {
            url: path.display().to_string(),
            end,
            ..span
        },
        path: path.to_path_buf(),
        info,
    })
}
