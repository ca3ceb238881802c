//! Detection product groups.
//!
//! A product group is one named bundle of detection artifacts (CSV, NetCDF,
//! JSON) for a single detector at a site. The group's name carries both its
//! temporal granularity and, usually, the deployment it was derived from.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::storage::{DEPLOYMENT_PREFIX, PRODUCT_PREFERENCE};
use crate::storage::object::basename_of;
use crate::windows::Mode;

/// One detection product "set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductGroup {
    /// Group name, usually the folder directly under the site.
    pub name: String,
    /// Granularity inferred from the name.
    pub mode: Mode,
    /// Artifact URLs in listing order.
    pub source_paths: Vec<String>,
    /// Artifact count per lower-cased extension.
    pub extension_counts: BTreeMap<String, usize>,
}

impl ProductGroup {
    /// Build a group, inferring its mode from the name.
    pub fn new(name: impl Into<String>, source_paths: Vec<String>) -> Self {
        let name = name.into();
        let mut extension_counts = BTreeMap::new();
        for path in &source_paths {
            *extension_counts.entry(extension_of(path)).or_insert(0) += 1;
        }
        Self {
            mode: Mode::from_group_name(&name),
            name,
            source_paths,
            extension_counts,
        }
    }

    /// Artifacts of the preferred type, see [`choose_best_files`].
    pub fn best_files(&self) -> Vec<String> {
        choose_best_files(&self.source_paths)
    }

    /// Deployment named in the group, if any.
    pub fn deployment(&self) -> Option<String> {
        deployment_from_set(&self.name)
    }
}

/// Keep only the first non-empty artifact type in `.csv`, `.nc`, `.json`
/// order; with none of those, return everything.
pub fn choose_best_files(paths: &[String]) -> Vec<String> {
    PRODUCT_PREFERENCE
        .iter()
        .map(|ext| {
            paths
                .iter()
                .filter(|p| extension_of(p) == *ext)
                .cloned()
                .collect::<Vec<_>>()
        })
        .find(|bucket| !bucket.is_empty())
        .unwrap_or_else(|| paths.to_vec())
}

/// Exact case-insensitive match on name, else the first group.
pub fn find_group_for_set<'a>(groups: &'a [ProductGroup], set: &str) -> Option<&'a ProductGroup> {
    let set = set.trim();
    groups
        .iter()
        .find(|g| g.name.eq_ignore_ascii_case(set))
        .or_else(|| groups.first())
}

/// First `sanctsound_<ll><dd>_<dd>` substring of `name`, lower-cased.
pub fn deployment_from_set(name: &str) -> Option<String> {
    let lower = name.to_ascii_lowercase();
    let width = DEPLOYMENT_PREFIX.len() + 7;
    lower
        .match_indices(DEPLOYMENT_PREFIX)
        .filter_map(|(i, _)| lower.get(i..i + width))
        .find(|candidate| is_deployment_name(candidate))
        .map(str::to_string)
}

/// Whether `name` is exactly a deployment folder name (case-insensitive).
pub fn is_deployment_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let Some(rest) = lower.strip_prefix(DEPLOYMENT_PREFIX) else {
        return false;
    };
    let b = rest.as_bytes();
    b.len() == 7
        && b[0].is_ascii_lowercase()
        && b[1].is_ascii_lowercase()
        && b[2].is_ascii_digit()
        && b[3].is_ascii_digit()
        && b[4] == b'_'
        && b[5].is_ascii_digit()
        && b[6].is_ascii_digit()
}

/// Group name for a product key below `<products_prefix>/<site>/`: the
/// directory directly under the site, or the file stem for loose files.
pub fn group_name_for_key(relative_key: &str) -> String {
    match relative_key.split_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => {
            let base = basename_of(relative_key);
            base.split('.').next().unwrap_or(base).to_string()
        }
    }
}

fn extension_of(path: &str) -> String {
    let base = basename_of(path);
    base.rfind('.')
        .map(|i| base[i..].to_ascii_lowercase())
        .unwrap_or_default()
}
