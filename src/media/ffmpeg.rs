//! ffmpeg cutting/concatenation and ffprobe metadata.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::audio::AudioInfo;
use crate::error::{Error, Result};

use super::tool::MediaTool;

/// Cuts and concatenates audio with ffmpeg.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    tool: MediaTool,
}

impl Ffmpeg {
    /// Wrap `program` with a per-invocation timeout.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: MediaTool::new(program, timeout),
        }
    }

    /// Cut `[offset, offset + duration)` of `input` into a 16-bit WAV.
    ///
    /// Without `duration_secs` the cut runs to the end of the input.
    pub fn cut(
        &self,
        input: &Path,
        offset_secs: f64,
        duration_secs: Option<f64>,
        output: &Path,
    ) -> Result<()> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-ss".into(),
            format!("{offset_secs:.3}").into(),
            "-i".into(),
            input.into(),
        ];
        if let Some(duration) = duration_secs {
            args.push("-t".into());
            args.push(format!("{duration:.3}").into());
        }
        args.extend(["-c:a".into(), "pcm_s16le".into(), output.into()]);
        self.tool.run(args)?;
        Ok(())
    }

    /// Concatenate `parts` in order into `output` via the concat demuxer.
    ///
    /// The list file is written to `list_file` and left for the caller
    /// to remove.
    pub fn concat(&self, parts: &[&Path], list_file: &Path, output: &Path) -> Result<()> {
        fs::write(list_file, concat_list(parts)).map_err(|source| Error::FileCreate {
            path: list_file.to_path_buf(),
            source,
        })?;
        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.into(),
            "-c".into(),
            "copy".into(),
            output.into(),
        ];
        self.tool.run(args)?;
        Ok(())
    }
}

/// Concat demuxer list with single quotes escaped.
fn concat_list(parts: &[&Path]) -> String {
    let mut list = String::new();
    for part in parts {
        let escaped = part.to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(list, "file '{escaped}'");
    }
    list
}

/// Stream facts reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbedStream {
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// First audio stream's rate.
    pub sample_rate: Option<u32>,
    /// First audio stream's channel count.
    pub channels: Option<u16>,
}

impl ProbedStream {
    /// Stream parameters, when both rate and channels were reported.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn audio_info(&self) -> Option<AudioInfo> {
        let sample_rate = self.sample_rate.filter(|r| *r > 0)?;
        let channels = self.channels.filter(|c| *c > 0)?;
        Some(AudioInfo {
            sample_rate,
            channels,
            frames: (self.duration_secs * f64::from(sample_rate)).round() as u64,
        })
    }
}

/// Reads durations with ffprobe.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    tool: MediaTool,
}

impl Ffprobe {
    /// Wrap `program` with a per-invocation timeout.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: MediaTool::new(program, timeout),
        }
    }

    /// Probe duration, rate and channels of `path`.
    pub fn probe(&self, path: &Path) -> Result<ProbedStream> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "a:0".into(),
            "-show_entries".into(),
            "stream=sample_rate,channels:format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1".into(),
            path.into(),
        ];
        let out = self.tool.run(args)?;
        parse_probe_output(&out.output).ok_or_else(|| Error::AudioDecode {
            path: path.to_path_buf(),
            source: format!("{} reported no duration", self.tool.program()).into(),
        })
    }
}

/// Parse `key=value` lines; a positive duration is required.
pub fn parse_probe_output(text: &str) -> Option<ProbedStream> {
    let mut duration = None;
    let mut sample_rate = None;
    let mut channels = None;
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "duration" => duration = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d > 0.0),
            "sample_rate" => sample_rate = value.parse().ok(),
            "channels" => channels = value.parse().ok(),
            _ => {}
        }
    }
    Some(ProbedStream {
        duration_secs: duration?,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let probed =
            parse_probe_output("sample_rate=48000\nchannels=1\nduration=3599.998000\n").unwrap();
        assert_eq!(probed.sample_rate, Some(48_000));
        assert_eq!(probed.channels, Some(1));
        assert!((probed.duration_secs - 3599.998).abs() < 1e-9);
    }

    #[test]
    fn test_stream_audio_info_needs_rate_and_channels() {
        let probed = parse_probe_output("sample_rate=8000\nchannels=2\nduration=1.5\n").unwrap();
        let info = probed.audio_info().unwrap();
        assert_eq!((info.sample_rate, info.channels, info.frames), (8000, 2, 12_000));

        let no_channels = parse_probe_output("sample_rate=8000\nduration=1.5\n").unwrap();
        assert!(no_channels.audio_info().is_none());
    }

    #[test]
    fn test_parse_probe_output_requires_duration() {
        assert!(parse_probe_output("sample_rate=48000\nduration=N/A\n").is_none());
        assert!(parse_probe_output("").is_none());
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[Path::new("/tmp/a.wav"), Path::new("/tmp/it's.wav")]);
        assert_eq!(list, "file '/tmp/a.wav'\nfile '/tmp/it'\\''s.wav'\n");
    }
}
