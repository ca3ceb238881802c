//! Downloaded recordings to clips, manifests and summaries.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clipper::{ClipExtractor, ClipSummary, LocalRecording, local_recording};
use crate::constants::clipper;
use crate::coverage::{AudioSpan, match_windows, sort_spans};
use crate::error::{Error, Result};
use crate::locking::FileLock;
use crate::media::Ffprobe;
use crate::output::{manifest, progress};
use crate::utils::timestamp::parse_filename_start;
use crate::windows::Mode;

use super::destination::Destination;
use super::preview::PreviewResult;

/// Result of clipping one group.
#[derive(Debug, Clone)]
pub struct GroupClipResult {
    /// Group name.
    pub group: String,
    /// Group granularity.
    pub mode: Mode,
    /// Per-group clip directory.
    pub dir: PathBuf,
    /// Outcomes.
    pub summary: ClipSummary,
    /// Written `clips_manifest.csv`.
    pub manifest: PathBuf,
    /// Written `clips_summary.txt`.
    pub summary_file: PathBuf,
}

/// Clips every window of one or more previewed groups.
pub struct ClipPipeline<'a> {
    extractor: &'a ClipExtractor,
    ffprobe: Option<Ffprobe>,
    default_span_secs: f64,
    lock_max_age: Duration,
    show_progress: bool,
}

impl<'a> ClipPipeline<'a> {
    /// Pipeline over `extractor`; `ffprobe` backs up the direct probe.
    pub fn new(
        extractor: &'a ClipExtractor,
        ffprobe: Option<Ffprobe>,
        default_span_secs: f64,
        show_progress: bool,
    ) -> Self {
        Self {
            extractor,
            ffprobe,
            default_span_secs,
            lock_max_age: Duration::from_secs(clipper::DEFAULT_LOCK_MAX_AGE_HOURS * 3600),
            show_progress,
        }
    }

    /// Age after which a leftover clip directory lock is taken over.
    #[must_use]
    pub fn with_lock_max_age(mut self, max_age: Duration) -> Self {
        self.lock_max_age = max_age;
        self
    }

    /// Clip every group; zero clips across all of them is an error.
    pub fn run(&self, dest: &Destination, previews: &[PreviewResult]) -> Result<Vec<GroupClipResult>> {
        let mut results = Vec::with_capacity(previews.len());
        for preview in previews {
            results.push(self.run_group(dest, preview)?);
        }

        let written: usize = results.iter().map(|r| r.summary.written).sum();
        if written == 0 {
            return Err(Error::NoUsableAudio {
                groups: results.len(),
                total_windows: results.iter().map(|r| r.summary.total_windows).sum(),
            });
        }
        Ok(results)
    }

    /// Clip one group into `<dest>/clips/<group>/`.
    pub fn run_group(&self, dest: &Destination, preview: &PreviewResult) -> Result<GroupClipResult> {
        let group = &preview.group.name;
        let mode = preview.plan.mode;
        let dir = dest.clips_dir(group)?;
        let _lock = FileLock::acquire(&dir, group, self.lock_max_age)?;

        let recordings = self.local_recordings(dest, preview);
        info!(
            "{group}: {} window(s), {} local recording(s)",
            preview.plan.windows.len(),
            recordings.len()
        );

        let report = match_windows(&recordings, &preview.plan.windows);
        let pb = progress::create_clip_progress(report.covers.len(), group, self.show_progress);
        let mut summary = ClipSummary::default();
        for cover in &report.covers {
            summary.push(self.extractor.extract(cover, &recordings, &dir));
            progress::inc_progress(pb.as_ref());
        }
        progress::finish_progress(pb, "Clipping complete");

        let manifest = manifest::write_manifest(&dir, mode, &summary)?;
        let summary_file = manifest::write_summary(&dir, mode, &summary)?;
        info!("{}", manifest::summary_text(&summary, mode, &dir).trim_end());

        Ok(GroupClipResult {
            group: group.clone(),
            mode,
            dir,
            summary,
            manifest,
            summary_file,
        })
    }

    /// Selected recordings present in `dest`, probed and sorted.
    fn local_recordings(&self, dest: &Destination, preview: &PreviewResult) -> Vec<LocalRecording> {
        let mut recordings = Vec::new();
        for name in preview.selected_names() {
            let path = dest.path_for(name);
            if !path.is_file() {
                warn!("{name}: selected but not downloaded, skipping");
                continue;
            }
            let Some(span) = span_for(name, &preview.spans) else {
                warn!("{name}: no decodable start time, skipping");
                continue;
            };
            let fallback = |p: &std::path::Path| {
                self.ffprobe
                    .as_ref()
                    .and_then(|probe| match probe.probe(p) {
                        Ok(stream) => Some(stream),
                        Err(e) => {
                            debug!("{}: ffprobe failed: {e}", p.display());
                            None
                        }
                    })
            };
            match local_recording(&path, span, fallback, self.default_span_secs) {
                Ok(recording) => recordings.push(recording),
                Err(e) => warn!("{name}: {e}"),
            }
        }
        sort_spans(&mut recordings);
        recordings
    }
}

/// The listed span for `name`, or one built from the file name.
fn span_for(name: &str, spans: &[AudioSpan]) -> Option<AudioSpan> {
    if let Some(span) = spans.iter().find(|s| s.basename == name) {
        return Some(span.clone());
    }
    let start = parse_filename_start(name)?;
    Some(AudioSpan {
        url: name.to_string(),
        basename: name.to_string(),
        deployment: String::new(),
        start,
        end: start,
    })
}
