//! Output files and progress reporting.

pub mod manifest;
pub mod progress;

pub use manifest::{ManifestWriter, summary_text, write_manifest, write_summary};
