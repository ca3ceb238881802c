//! Preview and verify-expected commands.

#![allow(clippy::print_stdout)]

use tracing::info;

use super::{PreviewArgs, VerifyArgs, debug_sink, open_catalog, resolve_destination, window_builder};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{
    DebugChannel, DebugSink, Destination, DirSink, PreviewPipeline, read_expected,
    verify_selection,
};

/// Run the preview command.
pub fn run_preview(args: PreviewArgs, config: &Config, show_progress: bool) -> Result<()> {
    let dest = resolve_destination(args.dest, config)?;
    let sink = debug_sink(args.dump_debug.as_deref());
    let catalog = open_catalog(config, show_progress)?;
    let builder = window_builder(config, args.group.only_long_runs);

    let result = PreviewPipeline::new(&catalog, builder, sink.as_ref(), show_progress).run(
        &args.group.site,
        &args.group.set,
        &dest,
    )?;
    println!("{}", result.summary_line());

    if args.dry_run {
        info!("Dry run: selected recordings not downloaded");
    } else {
        let paths = catalog.download(result.selected_urls(), dest.root(), show_progress)?;
        println!("Downloaded {} file(s) to {}", paths.len(), dest.root().display());
    }
    Ok(())
}

/// Run the verify-expected command.
pub fn run_verify(args: VerifyArgs, config: &Config, show_progress: bool) -> Result<()> {
    let dest = Destination::new(args.dest.unwrap_or_else(|| args.dump_debug.clone()))?;
    let sink = DirSink::new(&args.dump_debug);
    let catalog = open_catalog(config, show_progress)?;
    let builder = window_builder(config, args.group.only_long_runs);

    let expected = read_expected(&args.expect)?;
    let result = PreviewPipeline::new(&catalog, builder, &sink as &dyn DebugSink, show_progress)
        .run(&args.group.site, &args.group.set, &dest)?;
    println!("{}", result.summary_line());

    let report = sink.path_for(DebugChannel::ExpectedVsSelected);
    match verify_selection(&expected, result.selected_names(), &sink, report) {
        Ok(_) => {
            println!("Verification passed");
            Ok(())
        }
        Err(e) => {
            println!("Verification FAILED");
            Err(e)
        }
    }
}
