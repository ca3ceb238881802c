//! Audio probing and sample-exact reading.

mod decode;

pub use decode::{AudioInfo, FrameReader, probe_audio};
