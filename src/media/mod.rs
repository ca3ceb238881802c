//! External media tools (ffmpeg, ffprobe).

pub mod ffmpeg;
pub mod tool;

pub use ffmpeg::{Ffmpeg, Ffprobe, ProbedStream};
pub use tool::{MediaTool, ToolOutput, remediation_hint};
