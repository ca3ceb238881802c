//! Clip command: preview each set, download its selection, cut clips.

#![allow(clippy::print_stdout)]

use tracing::info;

use super::{ClipArgs, debug_sink, open_catalog, resolve_destination, window_builder};
use crate::clipper::ClipExtractor;
use crate::config::Config;
use crate::error::Result;
use crate::media::Ffprobe;
use crate::output::summary_text;
use crate::pipeline::{ClipPipeline, PreviewPipeline};

/// Run the clip command.
#[allow(clippy::cast_precision_loss)]
pub fn run_clip(args: ClipArgs, config: &Config, show_progress: bool) -> Result<()> {
    let dest = resolve_destination(args.dest, config)?;
    let sink = debug_sink(args.dump_debug.as_deref());
    let catalog = open_catalog(config, show_progress)?;
    let builder = window_builder(config, args.only_long_runs);
    let preview = PreviewPipeline::new(&catalog, builder, sink.as_ref(), show_progress);

    let mut previews = Vec::with_capacity(args.sets.len());
    for set in &args.sets {
        let result = preview.run(&args.site, set, &dest)?;
        println!("{}: {}", result.group.name, result.summary_line());
        catalog.download(result.selected_urls(), dest.root(), show_progress)?;
        previews.push(result);
    }

    let extractor = ClipExtractor::from_config(&config.clips);
    info!("Clip backend: {}", config.clips.backend);
    let ffprobe = Ffprobe::new(config.clips.ffprobe.clone(), config.clips.tool_timeout());
    let default_span_secs = config.matching.default_span_secs as f64;

    let results = ClipPipeline::new(&extractor, Some(ffprobe), default_span_secs, show_progress)
        .with_lock_max_age(config.clips.lock_max_age())
        .run(&dest, &previews)?;
    for result in &results {
        print!("{}", summary_text(&result.summary, result.mode, &result.dir));
    }
    Ok(())
}
