//! What a product group needs: windows, candidate recordings, selection.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::coverage::{AudioSpan, Cover, CoverageReport, match_windows};
use crate::detections::{ProductGroup, read_all_rows};
use crate::error::{Error, Result};
use crate::storage::{Catalog, ObjectRef, ObjectStore};
use crate::utils::timestamp::format_iso;
use crate::windows::{WindowBuilder, WindowPlan};

use super::debug::{DebugChannel, DebugSink};
use super::destination::Destination;

/// Everything known about a group before any audio is fetched.
#[derive(Debug, Clone)]
pub struct PreviewResult {
    /// Site code.
    pub site: String,
    /// Resolved product group.
    pub group: ProductGroup,
    /// Downloaded detection CSVs.
    pub csv_paths: Vec<PathBuf>,
    /// Windows built from the merged rows.
    pub plan: WindowPlan,
    /// Deployment named in the group, searched first.
    pub deployment: Option<String>,
    /// Candidate recordings across the site, sorted.
    pub spans: Vec<AudioSpan>,
    /// Per-window covers and the minimal selection.
    pub report: CoverageReport,
}

impl PreviewResult {
    /// `"<Hours|Days|Events>: N | unique files: M"`.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} | unique files: {}",
            self.plan.mode.plural_label(),
            self.plan.windows.len(),
            self.report.selection.len()
        )
    }

    /// Selected recording URLs.
    pub fn selected_urls(&self) -> &[String] {
        &self.report.selection.urls
    }

    /// Selected recording basenames.
    pub fn selected_names(&self) -> &[String] {
        &self.report.selection.basenames
    }
}

/// CSV reading, window building, catalog lookup and matching in one call.
pub struct PreviewPipeline<'a, S> {
    catalog: &'a Catalog<S>,
    builder: WindowBuilder,
    sink: &'a dyn DebugSink,
    show_progress: bool,
}

impl<'a, S: ObjectStore> PreviewPipeline<'a, S> {
    /// Pipeline over `catalog`, tracing into `sink`.
    pub fn new(
        catalog: &'a Catalog<S>,
        builder: WindowBuilder,
        sink: &'a dyn DebugSink,
        show_progress: bool,
    ) -> Self {
        Self {
            catalog,
            builder,
            sink,
            show_progress,
        }
    }

    /// Preview `set` at `site`, downloading its detection CSVs into `dest`.
    pub fn run(&self, site: &str, set: &str, dest: &Destination) -> Result<PreviewResult> {
        let group = self.catalog.find_group_for_set(site, set)?;
        info!("Product group: {} ({})", group.name, group.mode);

        let csv_urls: Vec<String> = group
            .best_files()
            .into_iter()
            .filter(|url| {
                ObjectRef::parse(url)
                    .and_then(|o| o.extension())
                    .is_some_and(|ext| ext == ".csv")
            })
            .collect();
        if csv_urls.is_empty() {
            return Err(Error::NoCsvArtifacts {
                group: group.name.clone(),
            });
        }

        let csv_paths = self
            .catalog
            .download(&csv_urls, dest.root(), self.show_progress)?;
        let rows = read_all_rows(&csv_paths, group.mode)?;
        let plan = self.builder.build(group.mode, &rows);
        let deployment = group.deployment();

        let spans = match plan.bounds() {
            Some((tmin, tmax)) => {
                debug!("window bounds {} .. {}", format_iso(&tmin), format_iso(&tmax));
                self.catalog
                    .list_audio_across(site, deployment.as_deref(), Some(tmin), Some(tmax))?
            }
            None => {
                info!("No detection windows in {}", group.name);
                Vec::new()
            }
        };

        let report = match_windows(&spans, &plan.windows);
        let result = PreviewResult {
            site: site.to_string(),
            group,
            csv_paths,
            plan,
            deployment,
            spans,
            report,
        };
        self.trace(&result);
        info!("{}", result.summary_line());
        Ok(result)
    }

    fn trace(&self, result: &PreviewResult) {
        let mut per_deployment: BTreeMap<&str, usize> = BTreeMap::new();
        for span in &result.spans {
            *per_deployment.entry(span.deployment.as_str()).or_insert(0) += 1;
        }
        for (deployment, count) in per_deployment {
            self.sink
                .append_line(DebugChannel::FolderListings, &format!("{deployment}\t{count}"));
        }

        let urls: Vec<String> = result.spans.iter().map(|s| s.url.clone()).collect();
        let names: Vec<String> = result.spans.iter().map(|s| s.basename.clone()).collect();
        self.sink.overwrite_lines(DebugChannel::CandidateUrls, &urls);
        self.sink.overwrite_lines(DebugChannel::CandidateNames, &names);
        self.sink
            .overwrite_lines(DebugChannel::SelectedUrls, result.selected_urls());
        self.sink
            .overwrite_lines(DebugChannel::SelectedNames, result.selected_names());

        let mut tsv = vec!["start_utc\tend_utc\tcover\tsources".to_string()];
        for cover in &result.report.covers {
            let (kind, sources) = describe_cover(cover.cover, &result.spans);
            tsv.push(format!(
                "{}\t{}\t{kind}\t{sources}",
                format_iso(&cover.window.start),
                format_iso(&cover.window.end)
            ));
            self.sink.append_line(
                DebugChannel::Explain,
                &format!(
                    "{} {}..{} -> {kind} {sources}",
                    result.group.name,
                    format_iso(&cover.window.start),
                    format_iso(&cover.window.end)
                ),
            );
        }
        self.sink.overwrite_lines(DebugChannel::Windows, &tsv);
    }
}

fn describe_cover(cover: Cover, spans: &[AudioSpan]) -> (&'static str, String) {
    let names: Vec<&str> = cover
        .indices()
        .into_iter()
        .filter_map(|i| spans.get(i).map(|s| s.basename.as_str()))
        .collect();
    let kind = match cover {
        Cover::Single(_) => "single",
        Cover::Spliced(..) => "spliced",
        Cover::Unmatched => "unmatched",
    };
    let sources = if names.is_empty() {
        "-".to_string()
    } else {
        names.join(" + ")
    };
    (kind, sources)
}
