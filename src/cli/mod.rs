//! CLI argument parsing and command handling.

mod args;
pub mod audio;
pub mod catalog;
pub mod clip;
pub mod preview;
mod validators;

pub use args::{
    ClipArgs, Cli, Command, ConfigAction, GroupArgs, ListAudioArgs, MetadataArgs, PreviewArgs,
    VerifyArgs,
};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{DebugSink, Destination, DirSink, NoopSink};
use crate::storage::{Catalog, GcsClient};
use crate::windows::{WindowBuilder, WindowOptions};

/// Catalog over the public bucket described by `config`.
pub fn open_catalog(config: &Config, show_progress: bool) -> Result<Catalog<GcsClient>> {
    let client = GcsClient::new(&config.storage, show_progress)?;
    Ok(Catalog::new(client, config))
}

/// Window builder from `[windows]`, with `--only-long-runs` forcing the run filter.
pub fn window_builder(config: &Config, only_long_runs: bool) -> WindowBuilder {
    let mut options = WindowOptions::from(&config.windows);
    if only_long_runs {
        options.min_run_hours = Some(config.windows.min_run_hours);
    }
    WindowBuilder::new(options)
}

/// `--dest`, else `defaults.destination`.
pub fn resolve_destination(explicit: Option<PathBuf>, config: &Config) -> Result<Destination> {
    let root = explicit
        .or_else(|| config.defaults.destination.clone())
        .ok_or_else(|| Error::ConfigValidation {
            message: "no destination (use --dest or set defaults.destination)".to_string(),
        })?;
    Destination::new(root)
}

/// A [`DirSink`] when a debug directory was given.
pub fn debug_sink(dir: Option<&Path>) -> Box<dyn DebugSink> {
    match dir {
        Some(dir) => Box::new(DirSink::new(dir)),
        None => Box::new(NoopSink),
    }
}
