//! Bucket traversal and the per-site recording index.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use super::listing::ObjectStore;
use super::mirror::Mirror;
use super::object::{ObjectRef, basename_of};
use crate::config::{Config, MatchingConfig};
use crate::constants::storage::{AUDIO_EXTENSIONS, AUDIO_FOLDER, DELIMITER, PRODUCT_PREFERENCE};
use crate::coverage::span::{AudioSpan, assign_span_ends, sort_spans};
use crate::detections::metadata::{
    GroupArtifact, MetadataFields, MetadataIndex, SiteMetadata, classify_group_key,
    deployment_number, is_site_code,
};
use crate::detections::product::{
    ProductGroup, find_group_for_set, group_name_for_key, is_deployment_name,
};
use crate::error::{Error, Result};
use crate::output::progress;
use crate::utils::TimeInstant;
use crate::utils::timestamp::parse_filename_start;

/// Left-boundary and span-length policy for building a recording index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPolicy {
    /// A recording starting before `tmin` is kept only within this distance.
    pub left_boundary: TimeDelta,
    /// Length given to the last recording of a deployment.
    pub default_span: TimeDelta,
}

impl From<&MatchingConfig> for IndexPolicy {
    #[allow(clippy::cast_possible_truncation)]
    fn from(config: &MatchingConfig) -> Self {
        Self {
            left_boundary: TimeDelta::milliseconds(
                (config.left_boundary_hours * 3_600_000.0).round() as i64,
            ),
            default_span: TimeDelta::seconds(
                i64::try_from(config.default_span_secs).unwrap_or(i64::MAX / 1000),
            ),
        }
    }
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

/// Site/deployment view over an [`ObjectStore`].
pub struct Catalog<S> {
    store: S,
    bucket: String,
    audio_prefix: String,
    products_prefix: String,
    policy: IndexPolicy,
    mirror: Option<Mirror>,
}

impl<S: ObjectStore> Catalog<S> {
    /// Catalog over `store` laid out per `config`.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            bucket: config.storage.bucket.clone(),
            audio_prefix: config.storage.audio_prefix.trim_matches('/').to_string(),
            products_prefix: config.storage.products_prefix.trim_matches('/').to_string(),
            policy: IndexPolicy::from(&config.matching),
            mirror: config.storage.mirror_root.as_ref().map(Mirror::new),
        }
    }

    /// Bucket this catalog reads.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Index policy in effect.
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    /// One level of `prefix` across all pages: leaf objects and sub-prefixes.
    pub fn list_children(&self, prefix: &str) -> Result<(Vec<ObjectRef>, Vec<String>)> {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(&self.bucket, prefix, Some(DELIMITER), token.as_deref())?;
            objects.extend(
                page.items
                    .into_iter()
                    .filter(|item| !item.name.ends_with(DELIMITER))
                    .map(|item| ObjectRef::new(&self.bucket, item.name)),
            );
            prefixes.extend(page.prefixes);

            match page.next_page_token {
                Some(next) if seen_tokens.insert(next.clone()) => token = Some(next),
                Some(next) => {
                    warn!("listing of '{prefix}' repeated page token '{next}', stopping");
                    break;
                }
                None => break,
            }
        }

        Ok((objects, prefixes))
    }

    /// Every object below `prefix`, descending into sub-prefixes.
    ///
    /// Each prefix is listed at most once, so a backend that reports a
    /// prefix as its own child cannot cause endless recursion.
    pub fn list_prefix(&self, prefix: &str) -> Result<Vec<ObjectRef>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([prefix.to_string()]);
        let mut objects = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let (leaves, children) = self.list_children(&current)?;
            debug!(
                "{current}: {} object(s), {} prefix(es)",
                leaves.len(),
                children.len()
            );
            objects.extend(leaves);
            queue.extend(children.into_iter().filter(|c| !visited.contains(c)));
        }

        objects.sort();
        objects.dedup();
        Ok(objects)
    }

    fn site_audio_prefix(&self, site: &str) -> String {
        format!("{}/{}/", self.audio_prefix, site.trim().to_ascii_lowercase())
    }

    /// Deployment folders under a site's audio prefix, sorted.
    pub fn list_deployments(&self, site: &str) -> Result<Vec<String>> {
        let (_, prefixes) = self.list_children(&self.site_audio_prefix(site))?;
        let mut names: Vec<String> = prefixes
            .iter()
            .map(|p| basename_of(p).to_string())
            .filter(|name| is_deployment_name(name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Audio objects of one deployment, unfiltered by time.
    pub fn list_audio_objects(&self, site: &str, deployment: &str) -> Result<Vec<ObjectRef>> {
        let prefix = format!(
            "{}{deployment}/{AUDIO_FOLDER}/",
            self.site_audio_prefix(site)
        );
        let objects = self.list_prefix(&prefix)?;
        Ok(objects.into_iter().filter(is_audio_object).collect())
    }

    /// Recording spans of one deployment around `[tmin, tmax]`.
    pub fn build_audio_index(
        &self,
        site: &str,
        deployment: &str,
        tmin: Option<TimeInstant>,
        tmax: Option<TimeInstant>,
    ) -> Result<Vec<AudioSpan>> {
        let objects = self.list_audio_objects(site, deployment)?;
        Ok(index_recordings(
            &objects,
            deployment,
            tmin,
            tmax,
            self.policy,
        ))
    }

    /// Recording spans across all deployments of a site, the preferred
    /// deployment listed first, merged into one timeline.
    pub fn list_audio_across(
        &self,
        site: &str,
        preferred: Option<&str>,
        tmin: Option<TimeInstant>,
        tmax: Option<TimeInstant>,
    ) -> Result<Vec<AudioSpan>> {
        let deployments = self.list_deployments(site)?;
        let ordered: Vec<&str> = preferred
            .into_iter()
            .chain(
                deployments
                    .iter()
                    .map(String::as_str)
                    .filter(|d| Some(*d) != preferred),
            )
            .collect();

        let mut all = Vec::new();
        for deployment in ordered {
            let spans = self.build_audio_index(site, deployment, tmin, tmax)?;
            debug!("{deployment}: {} recording(s) in range", spans.len());
            all.extend(spans);
        }
        sort_spans(&mut all);
        Ok(all)
    }

    /// Product groups for a site whose artifact names contain `tag`.
    pub fn list_product_groups(&self, site: &str, tag: &str) -> Result<Vec<ProductGroup>> {
        let site_prefix = format!(
            "{}/{}/",
            self.products_prefix,
            site.trim().to_ascii_lowercase()
        );
        let tag = tag.trim().to_ascii_lowercase();

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for object in self.list_prefix(&site_prefix)? {
            let is_product = object
                .extension()
                .is_some_and(|ext| PRODUCT_PREFERENCE.contains(&ext.as_str()));
            let relative = object.key.strip_prefix(&site_prefix).unwrap_or(&object.key);
            if !is_product || !relative.to_ascii_lowercase().contains(&tag) {
                continue;
            }
            grouped
                .entry(group_name_for_key(relative))
                .or_default()
                .push(object.gs_url());
        }

        Ok(grouped
            .into_iter()
            .map(|(name, paths)| ProductGroup::new(name, paths))
            .collect())
    }

    /// The group for `set`: exact name match, else the first tagged group.
    pub fn find_group_for_set(&self, site: &str, set: &str) -> Result<ProductGroup> {
        let groups = self.list_product_groups(site, set)?;
        find_group_for_set(&groups, set)
            .cloned()
            .ok_or_else(|| Error::ProductGroupNotFound {
                site: site.to_string(),
                set: set.to_string(),
            })
    }

    /// Fetch `urls` into `dest`, one file per basename.
    ///
    /// The offline mirror is consulted before the store.
    pub fn download(&self, urls: &[String], dest: &Path, show_progress: bool) -> Result<Vec<PathBuf>> {
        let pb = progress::create_download_progress(urls.len(), show_progress);
        let mut written = Vec::with_capacity(urls.len());

        for url in urls {
            let object = ObjectRef::parse(url).ok_or_else(|| Error::DownloadFailed {
                url: url.clone(),
                source: "not a gs:// or https:// object URL".into(),
            })?;
            let local = dest.join(object.basename());
            let bytes = self.fetch_object(&object, &local)?;

            debug!("{} -> {} ({bytes} bytes)", object, local.display());
            if let Some(pb) = pb.as_ref() {
                pb.set_message(object.basename().to_string());
            }
            progress::inc_progress(pb.as_ref());
            written.push(local);
        }

        progress::finish_progress(pb, "Downloads complete");
        info!("Downloaded {} file(s) to {}", written.len(), dest.display());
        Ok(written)
    }

    /// One object to `local`, from the mirror when it has a copy.
    fn fetch_object(&self, object: &ObjectRef, local: &Path) -> Result<u64> {
        if let Some(mirror) = &self.mirror
            && let Some(bytes) = mirror.fetch(object, local)?
        {
            return Ok(bytes);
        }
        self.store.fetch(object, local)
    }

    /// Site codes with a folder under the products prefix, sorted.
    ///
    /// When the top level shows no site-shaped folder, every product key is
    /// scanned instead.
    pub fn discover_sites(&self) -> Result<Vec<String>> {
        let base = format!("{}/", self.products_prefix);
        let (_, children) = self.list_children(&base)?;
        let mut found: BTreeSet<String> =
            children.iter().filter_map(|c| site_of(&base, c)).collect();
        if found.is_empty() {
            debug!("no site folders under {base}, scanning keys");
            found = self
                .list_prefix(&base)?
                .iter()
                .filter_map(|o| site_of(&base, &o.key))
                .collect();
        }
        info!("Discovered {} site(s)", found.len());
        Ok(found.into_iter().collect())
    }

    /// Deployment metadata for `sites`.
    ///
    /// Up to `max_json_per_group` metadata documents per product group are
    /// fetched into `cache_dir/<site>/<group>/`. Unreadable documents are
    /// logged and skipped.
    pub fn build_metadata_index(
        &self,
        sites: &[String],
        cache_dir: &Path,
        max_json_per_group: usize,
    ) -> Result<MetadataIndex> {
        let mut index = MetadataIndex::default();

        for site in sites {
            let site = site.trim().to_ascii_lowercase();
            let site_prefix = format!("{}/{site}/", self.products_prefix);

            let mut documents: BTreeMap<String, Vec<ObjectRef>> = BTreeMap::new();
            let mut csv_counts: BTreeMap<String, usize> = BTreeMap::new();
            for object in self.list_prefix(&site_prefix)? {
                let relative = object.key.strip_prefix(&site_prefix).unwrap_or(&object.key);
                match classify_group_key(relative) {
                    Some((group, GroupArtifact::Metadata)) => {
                        documents.entry(group).or_default().push(object);
                    }
                    Some((group, GroupArtifact::Data)) => *csv_counts.entry(group).or_default() += 1,
                    None => {}
                }
            }

            let mut entry = SiteMetadata::new(&site);
            let groups: BTreeSet<&String> = documents.keys().chain(csv_counts.keys()).collect();
            for group in groups {
                let deployment = entry.deployments.entry(deployment_number(group)).or_default();
                deployment.csv_count += csv_counts.get(group).copied().unwrap_or(0);

                let group_dir = cache_dir.join(&site).join(group);
                let docs = documents.get(group).map_or(&[][..], Vec::as_slice);
                for object in docs.iter().take(max_json_per_group) {
                    match self.read_metadata(object, &group_dir) {
                        Ok(fields) => deployment.absorb(fields, &object.gs_url()),
                        Err(e) => warn!("{object}: {e}"),
                    }
                }
            }
            for (number, deployment) in &mut entry.deployments {
                deployment.label_or(format!("{} - {number}", site.to_ascii_uppercase()));
            }

            info!(
                "{site}: {} deployment(s) from {} metadata document(s)",
                entry.deployments.len(),
                entry.deployments.values().map(|d| d.json_urls.len()).sum::<usize>()
            );
            index.sites.insert(site, entry);
        }

        Ok(index)
    }

    fn read_metadata(&self, object: &ObjectRef, dir: &Path) -> Result<MetadataFields> {
        fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;
        let local = dir.join(object.basename());
        self.fetch_object(object, &local)?;
        let text = fs::read_to_string(&local)?;
        MetadataFields::parse(&text).map_err(|source| Error::MetadataParse {
            path: local,
            source,
        })
    }
}

/// Lower-case site code of the first path segment after `base`.
fn site_of(base: &str, key: &str) -> Option<String> {
    let first = key.strip_prefix(base)?.split('/').next()?;
    is_site_code(first).then(|| first.to_ascii_lowercase())
}

/// Turn a deployment's audio objects into sorted spans.
///
/// Names without a decodable start are skipped. Recordings starting before
/// `tmin` are dropped except the latest one, which is kept when it starts
/// within `policy.left_boundary` of `tmin`. Recordings starting after
/// `tmax` are dropped.
pub fn index_recordings(
    objects: &[ObjectRef],
    deployment: &str,
    tmin: Option<TimeInstant>,
    tmax: Option<TimeInstant>,
    policy: IndexPolicy,
) -> Vec<AudioSpan> {
    let mut spans = Vec::new();
    let mut left_candidate: Option<AudioSpan> = None;

    for object in objects.iter().filter(|o| is_audio_object(o)) {
        let Some(start) = parse_filename_start(object.basename()) else {
            warn!("skipping recording with undecodable name: {object}");
            continue;
        };
        let span = AudioSpan {
            url: object.gs_url(),
            basename: object.basename().to_string(),
            deployment: deployment.to_string(),
            start,
            end: start,
        };

        if let Some(tmin) = tmin
            && start < tmin
        {
            if left_candidate.as_ref().is_none_or(|c| c.start < start) {
                left_candidate = Some(span);
            }
            continue;
        }
        if let Some(tmax) = tmax
            && start > tmax
        {
            continue;
        }
        spans.push(span);
    }

    if let Some(candidate) = left_candidate
        && tmin.is_none_or(|tmin| tmin - candidate.start <= policy.left_boundary)
    {
        spans.push(candidate);
    }

    sort_spans(&mut spans);
    spans.dedup_by(|a, b| a.url == b.url);
    assign_span_ends(&mut spans, policy.default_span);
    spans
}

fn is_audio_object(object: &ObjectRef) -> bool {
    object.extension().is_some_and(|ext| {
        AUDIO_EXTENSIONS
            .iter()
            .any(|known| ext.trim_start_matches('.') == *known)
    })
}
