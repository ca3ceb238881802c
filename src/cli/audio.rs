//! list-audio command.

#![allow(clippy::print_stdout)]

use std::fs;

use super::{ListAudioArgs, open_catalog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::ensure_dir;

/// List a deployment folder's recordings into `--dump`.
pub fn run_list_audio(args: ListAudioArgs, config: &Config, show_progress: bool) -> Result<()> {
    let catalog = open_catalog(config, show_progress)?;
    let spans = catalog.build_audio_index(&args.site, &args.folder, args.tmin, args.tmax)?;

    if let Some(parent) = args.dump.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let text: String = spans.iter().map(|s| format!("{}\n", s.url)).collect();
    fs::write(&args.dump, text).map_err(|source| Error::FileCreate {
        path: args.dump.clone(),
        source,
    })?;

    println!("Listed URLs: {}", spans.len());
    Ok(())
}
