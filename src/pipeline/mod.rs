//! Preview, clip and verification pipelines.

mod clip;
pub mod debug;
mod destination;
mod preview;
mod verify;

pub use clip::{ClipPipeline, GroupClipResult};
pub use debug::{DebugChannel, DebugSink, DirSink, NoopSink};
pub use destination::{Destination, ensure_dir};
pub use preview::{PreviewPipeline, PreviewResult};
pub use verify::{Verification, read_expected, verify_selection};
