//! Clip extraction from downloaded recordings.
//!
//! Windows resolved by the coverage matcher are cut (or cut and spliced)
//! into WAV clips, each classified by a [`ClipStatus`].

mod extractor;
mod status;
mod writer;

pub use extractor::{
    ClipExtractor, FfmpegCutter, LocalRecording, NativeCutter, SegmentCutter, local_recording,
    secs_to_frames,
};
pub use status::{ClipFailure, ClipOutcome, ClipStatus, ClipSummary};
pub use writer::{WavWriter, clip_filename, sanitize_filename};
