//! Progress bars for downloads and clip extraction.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar counting downloaded files.
pub fn create_download_progress(total_files: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_files == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_files as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Create a byte progress bar for one object transfer.
pub fn create_transfer_progress(total_bytes: u64, name: &str, enabled: bool) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(format!("Downloading {name}..."));
    Some(pb)
}

/// Create a progress bar for the windows of one product group.
pub fn create_clip_progress(total_windows: usize, group: &str, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_windows == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_windows as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} windows - {group}"
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

/// Set an absolute position on a progress bar.
pub fn set_progress(pb: Option<&ProgressBar>, position: u64) {
    if let Some(pb) = pb {
        pb.set_position(position);
    }
}
