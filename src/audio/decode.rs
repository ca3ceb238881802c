//! Audio probing and frame-accurate reading using symphonia.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::constants::clipper::SEEK_THRESHOLD_SECS;
use crate::error::{Error, Result};

/// Stream parameters of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Length in frames (samples per channel).
    pub frames: u64,
}

impl AudioInfo {
    /// Length in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / f64::from(self.sample_rate)
    }

    /// Whether another stream can be spliced onto this one unchanged.
    pub fn same_format(&self, other: &Self) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }
}

/// Probe rate, channels and length.
///
/// The frame count comes from the container header when present,
/// otherwise the file is decoded once to count it.
pub fn probe_audio(path: &Path) -> Result<AudioInfo> {
    let mut reader = FrameReader::open(path)?;
    let frames = match reader.declared_frames {
        Some(frames) => frames,
        None => {
            debug!("{}: no frame count in header, decoding to count", path.display());
            reader.read_frames(u64::MAX, |_| Ok(()))?
        }
    };
    Ok(AudioInfo {
        frames,
        ..reader.info
    })
}

/// Sequential reader of interleaved 16-bit frames with forward seeking.
pub struct FrameReader {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: AudioInfo,
    declared_frames: Option<u64>,
    /// Frame index the next delivered sample belongs to.
    cursor: u64,
    /// Decoded samples starting at `cursor` not yet delivered.
    carry: Vec<i16>,
    buffer: Option<SampleBuffer<i16>>,
    buffer_frames: usize,
}

impl FrameReader {
    /// Open a file and select its first audio track.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::AudioOpen {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::AudioOpen {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::NoAudioTracks {
                path: path.to_path_buf(),
            })?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::AudioDecode {
                path: path.to_path_buf(),
                source: "missing sample rate".into(),
            })?;
        let channels = track
            .codec_params
            .channels
            .map_or(1, symphonia::core::audio::Channels::count);
        let channels = u16::try_from(channels).map_err(|_| Error::AudioDecode {
            path: path.to_path_buf(),
            source: format!("unsupported channel count {channels}").into(),
        })?;
        let declared_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::AudioDecode {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            info: AudioInfo {
                sample_rate,
                channels,
                frames: declared_frames.unwrap_or(0),
            },
            declared_frames,
            cursor: 0,
            carry: Vec::new(),
            buffer: None,
            buffer_frames: 0,
        })
    }

    /// Stream parameters; `frames` is zero when the header has no count.
    pub fn info(&self) -> AudioInfo {
        self.info
    }

    /// Position the reader so the next frame delivered is `frame`.
    ///
    /// Short forward moves decode and discard; longer ones, and any move
    /// backwards, use the container's accurate seek.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn seek(&mut self, frame: u64) -> Result<()> {
        let threshold = (SEEK_THRESHOLD_SECS * f64::from(self.info.sample_rate)) as u64;
        let far = frame < self.cursor || frame - self.cursor > threshold;
        if far {
            let target = SeekTo::TimeStamp {
                ts: frame,
                track_id: self.track_id,
            };
            match self.format.seek(SeekMode::Accurate, target) {
                Ok(seeked) => {
                    self.decoder.reset();
                    self.carry.clear();
                    debug!(
                        "{}: seek to frame {frame} landed at {}",
                        self.path.display(),
                        seeked.actual_ts
                    );
                }
                Err(e) if frame < self.cursor => {
                    return Err(Error::AudioDecode {
                        path: self.path.clone(),
                        source: Box::new(e),
                    });
                }
                Err(e) => warn!(
                    "{}: seek to frame {frame} failed ({e}), decoding forward",
                    self.path.display()
                ),
            }
        }
        if frame >= self.cursor {
            let drop = usize::try_from(frame - self.cursor)
                .unwrap_or(usize::MAX)
                .saturating_mul(usize::from(self.info.channels));
            self.carry.drain(..drop.min(self.carry.len()));
        }
        self.cursor = frame;
        Ok(())
    }

    /// Deliver up to `count` frames to `sink`; returns frames delivered.
    ///
    /// Fewer than `count` frames means the stream ended.
    pub fn read_frames<F>(&mut self, count: u64, mut sink: F) -> Result<u64>
    where
        F: FnMut(&[i16]) -> Result<()>,
    {
        let channels = usize::from(self.info.channels);
        let end = self.cursor.saturating_add(count);
        let mut delivered = 0u64;

        if !self.carry.is_empty() {
            let take = frames_in(&self.carry, channels).min(end - self.cursor);
            let samples = to_usize(take) * channels;
            sink(&self.carry[..samples])?;
            self.carry.drain(..samples);
            self.cursor += take;
            delivered += take;
        }

        while self.cursor < end {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(Error::AudioDecode {
                        path: self.path.clone(),
                        source: Box::new(e),
                    });
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }
            let ts = packet.ts();

            let decoded = self.decoder.decode(&packet).map_err(|e| Error::AudioDecode {
                path: self.path.clone(),
                source: Box::new(e),
            })?;
            let frames = decoded.frames();
            if ts + frames as u64 <= self.cursor {
                continue;
            }

            if self.buffer.is_none() || self.buffer_frames < decoded.capacity() {
                self.buffer_frames = decoded.capacity();
                self.buffer = Some(SampleBuffer::new(
                    self.buffer_frames as u64,
                    *decoded.spec(),
                ));
            }
            let Some(buffer) = self.buffer.as_mut() else {
                continue;
            };
            buffer.copy_interleaved_ref(decoded);
            let samples = buffer.samples();

            // A packet may start before the cursor after a seek.
            let skip = to_usize(self.cursor.saturating_sub(ts)) * channels;
            let available = &samples[skip.min(samples.len())..];
            let take = frames_in(available, channels).min(end - self.cursor);
            let used = to_usize(take) * channels;

            sink(&available[..used])?;
            self.carry.extend_from_slice(&available[used..]);
            self.cursor += take;
            delivered += take;
        }

        Ok(delivered)
    }
}

fn frames_in(samples: &[i16], channels: usize) -> u64 {
    (samples.len() / channels.max(1)) as u64
}

fn to_usize(frames: u64) -> usize {
    usize::try_from(frames).unwrap_or(usize::MAX)
}
