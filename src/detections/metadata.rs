//! Deployment metadata gathered from product groups' `metadata/*.json`.
//!
//! Detector teams publish loosely structured JSON next to their CSVs, so
//! each field is looked up under several aliases, first at the top level
//! and then one object deep. The index keeps the first non-empty value per
//! deployment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::utils::sites;

const SITE_ALIASES: &[&str] = &["site", "site_code", "station_code", "location_id"];
const LOCATION_ALIASES: &[&str] = &[
    "location",
    "station_name",
    "site_name",
    "region",
    "subregion",
    "deployment_zone",
];
const LAT_ALIASES: &[&str] = &["lat", "latitude", "Latitude", "LAT"];
const LON_ALIASES: &[&str] = &["lon", "longitude", "Longitude", "LON"];
const DEPTH_ALIASES: &[&str] = &[
    "depth",
    "Depth",
    "depth_m",
    "water_depth",
    "water_depth_m",
    "bottom_depth_m",
    "sensor_depth",
];
const START_ALIASES: &[&str] = &[
    "start",
    "start_time",
    "StartTime",
    "recording_start_utc",
    "deployment_start_utc",
    "utc_start",
];
const END_ALIASES: &[&str] = &[
    "end",
    "end_time",
    "EndTime",
    "recording_end_utc",
    "deployment_end_utc",
    "utc_end",
];
const RATE_ALIASES: &[&str] = &[
    "sample_rate",
    "fs",
    "sample_rate_hz",
    "Fs",
    "sampling_rate",
    "sampling_rate_hz",
];
const PLATFORM_ALIASES: &[&str] = &[
    "platform",
    "moorings",
    "platform_name",
    "platform_id",
    "platform_type",
];
const RECORDER_ALIASES: &[&str] = &[
    "recorder",
    "instrument",
    "device",
    "model",
    "instrument_model",
    "recorder_model",
    "hydrophone_model",
];
const NOTE_ALIASES: &[&str] = &["location_note", "comments"];

/// Fields read from one metadata document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFields {
    /// Site code, lower-cased.
    pub site: Option<String>,
    /// Human-readable location.
    pub location: Option<String>,
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lon: Option<f64>,
    /// Sensor depth in metres.
    pub depth_m: Option<f64>,
    /// Recording start as written.
    pub start_utc: Option<String>,
    /// Recording end as written.
    pub end_utc: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate_hz: Option<f64>,
    /// Mooring or platform.
    pub platform: Option<String>,
    /// Recorder or hydrophone model.
    pub recorder: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
}

impl MetadataFields {
    /// Extract known fields from a parsed document.
    pub fn from_json(doc: &Value) -> Self {
        let Some(obj) = doc.as_object() else {
            return Self::default();
        };
        Self {
            site: pick_text(obj, SITE_ALIASES).map(|s| s.to_ascii_lowercase()),
            location: pick_text(obj, LOCATION_ALIASES),
            lat: pick_number(obj, LAT_ALIASES),
            lon: pick_number(obj, LON_ALIASES),
            depth_m: pick_number(obj, DEPTH_ALIASES),
            start_utc: pick_text(obj, START_ALIASES),
            end_utc: pick_text(obj, END_ALIASES),
            sample_rate_hz: pick_number(obj, RATE_ALIASES),
            platform: pick_text(obj, PLATFORM_ALIASES),
            recorder: pick_text(obj, RECORDER_ALIASES),
            note: pick_text(obj, NOTE_ALIASES),
        }
    }

    /// Parse and extract from JSON text.
    pub fn parse(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let doc: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&doc))
    }
}

/// First alias present at the top level, else in any nested object.
fn pick<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    let usable = |v: &&Value| !v.is_null();
    aliases
        .iter()
        .find_map(|k| obj.get(*k).filter(usable))
        .or_else(|| {
            obj.values()
                .filter_map(Value::as_object)
                .find_map(|inner| aliases.iter().find_map(|k| inner.get(*k).filter(usable)))
        })
}

fn pick_text(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    let text = match pick(obj, aliases)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn pick_number(obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    let value = match pick(obj, aliases)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite())
}

/// What is known about one deployment of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    /// Location name, or `SITE - NN` when none was published.
    pub label: Option<String>,
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lon: Option<f64>,
    /// Sensor depth in metres.
    pub depth_m: Option<f64>,
    /// Recording start as written.
    pub start_utc: Option<String>,
    /// Recording end as written.
    pub end_utc: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate_hz: Option<f64>,
    /// Mooring or platform.
    pub platform: Option<String>,
    /// Recorder or hydrophone model.
    pub recorder: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
    /// Metadata documents that contributed.
    pub json_urls: Vec<String>,
    /// Detection CSVs listed across the deployment's groups.
    pub csv_count: usize,
}

impl DeploymentMetadata {
    /// Fill empty fields from `fields`; earlier documents win.
    pub fn absorb(&mut self, fields: MetadataFields, url: &str) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.lat, fields.lat);
        fill(&mut self.lon, fields.lon);
        fill(&mut self.depth_m, fields.depth_m);
        fill(&mut self.start_utc, fields.start_utc);
        fill(&mut self.end_utc, fields.end_utc);
        fill(&mut self.sample_rate_hz, fields.sample_rate_hz);
        fill(&mut self.platform, fields.platform);
        fill(&mut self.recorder, fields.recorder);
        fill(&mut self.note, fields.note);
        fill(&mut self.label, fields.location);
        self.json_urls.push(url.to_string());
    }

    /// Label `fallback` when no document named a location.
    pub fn label_or(&mut self, fallback: String) {
        self.label.get_or_insert(fallback);
    }

    /// `lat, lon, depth m`, skipping unknown parts.
    pub fn coordinates(&self) -> String {
        let mut parts = Vec::new();
        if let Some(lat) = self.lat {
            parts.push(lat.to_string());
        }
        if let Some(lon) = self.lon {
            parts.push(lon.to_string());
        }
        if let Some(depth) = self.depth_m {
            parts.push(format!("{depth} m"));
        }
        parts.join(", ")
    }
}

/// Deployments of one site, keyed by two-digit deployment number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMetadata {
    /// `Sanctuary - CODE`.
    pub label: String,
    /// Deployments by number; `??` collects groups without one.
    pub deployments: BTreeMap<String, DeploymentMetadata>,
}

impl SiteMetadata {
    /// Empty entry for `code`.
    pub fn new(code: &str) -> Self {
        Self {
            label: sites::label_for_code(code),
            deployments: BTreeMap::new(),
        }
    }
}

/// Metadata for every scanned site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    /// Sites by lower-case code.
    pub sites: BTreeMap<String, SiteMetadata>,
}

impl MetadataIndex {
    /// Number of deployments across all sites.
    pub fn deployment_count(&self) -> usize {
        self.sites.values().map(|s| s.deployments.len()).sum()
    }

    /// Write the index as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Internal {
            message: format!("failed to serialize metadata index: {e}"),
        })?;
        fs::write(path, json).map_err(|source| Error::FileCreate {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Two-digit deployment number from a group name, `??` when absent.
///
/// `sanctsound_ci01_02_dolphins_1h` gives `02`.
pub fn deployment_number(group: &str) -> String {
    let lower = group.to_ascii_lowercase();
    lower
        .match_indices("sanctsound_")
        .find_map(|(i, prefix)| {
            let rest = lower.get(i + prefix.len()..)?;
            let b = rest.as_bytes();
            let shaped = b.len() >= 7
                && b[..2].iter().all(u8::is_ascii_lowercase)
                && b[2..4].iter().all(u8::is_ascii_digit)
                && b[4] == b'_'
                && b[5..7].iter().all(u8::is_ascii_digit);
            shaped.then(|| rest[5..7].to_string())
        })
        .unwrap_or_else(|| "??".to_string())
}

/// Whether `name` looks like a site code such as `ci01`.
pub fn is_site_code(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 4 && b[..2].iter().all(u8::is_ascii_alphabetic) && b[2..].iter().all(u8::is_ascii_digit)
}

/// Role of an object inside a product group folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupArtifact {
    /// `<group>/metadata/*.json`.
    Metadata,
    /// `<group>/data/*.csv`.
    Data,
}

/// Group name and role for a key relative to the site folder.
pub fn classify_group_key(relative: &str) -> Option<(String, GroupArtifact)> {
    let (group, rest) = relative.split_once('/')?;
    let lower = rest.to_ascii_lowercase();
    let role = if lower.starts_with("metadata/") && lower.ends_with(".json") {
        GroupArtifact::Metadata
    } else if lower.starts_with("data/") && lower.ends_with(".csv") {
        GroupArtifact::Data
    } else {
        return None;
    };
    Some((group.to_string(), role))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_from_aliases_and_nested_objects() {
        let fields = MetadataFields::parse(
            r#"{
                "site_code": "CI01",
                "deployment": {"latitude": "34.04", "longitude": -120.1, "water_depth_m": 25},
                "StartTime": "2018-11-01T00:00:00Z",
                "fs": 48000,
                "model": "SoundTrap ST500",
                "comments": ""
            }"#,
        )
        .unwrap();
        assert_eq!(fields.site.as_deref(), Some("ci01"));
        assert_eq!(fields.lat, Some(34.04));
        assert_eq!(fields.lon, Some(-120.1));
        assert_eq!(fields.depth_m, Some(25.0));
        assert_eq!(fields.start_utc.as_deref(), Some("2018-11-01T00:00:00Z"));
        assert_eq!(fields.sample_rate_hz, Some(48_000.0));
        assert_eq!(fields.recorder.as_deref(), Some("SoundTrap ST500"));
        assert_eq!(fields.note, None);
        assert_eq!(fields.end_utc, None);
    }

    #[test]
    fn test_non_object_document_has_no_fields() {
        assert_eq!(MetadataFields::parse("[1, 2]").unwrap(), MetadataFields::default());
        assert!(MetadataFields::parse("{not json").is_err());
    }

    #[test]
    fn test_absorb_keeps_first_values() {
        let mut dep = DeploymentMetadata::default();
        let first = MetadataFields {
            lat: Some(34.0),
            ..MetadataFields::default()
        };
        let second = MetadataFields {
            lat: Some(99.0),
            lon: Some(-120.0),
            location: Some("Santa Rosa".to_string()),
            ..MetadataFields::default()
        };
        dep.absorb(first, "gs://b/a.json");
        dep.absorb(second, "gs://b/b.json");
        dep.label_or("CI01 - 01".to_string());
        assert_eq!(dep.lat, Some(34.0));
        assert_eq!(dep.lon, Some(-120.0));
        assert_eq!(dep.label.as_deref(), Some("Santa Rosa"));
        assert_eq!(dep.json_urls.len(), 2);
        assert_eq!(dep.coordinates(), "34, -120");
    }

    #[test]
    fn test_deployment_number() {
        assert_eq!(deployment_number("sanctsound_ci01_02_dolphins_1h"), "02");
        assert_eq!(deployment_number("SanctSound_HI03_11_humpback"), "11");
        assert_eq!(deployment_number("ci01_dolphins"), "??");
    }

    #[test]
    fn test_site_codes_and_group_keys() {
        assert!(is_site_code("ci01"));
        assert!(!is_site_code("ci1"));
        assert!(!is_site_code("metadata"));

        assert_eq!(
            classify_group_key("g1/metadata/a.JSON"),
            Some(("g1".to_string(), GroupArtifact::Metadata))
        );
        assert_eq!(
            classify_group_key("g1/data/a_1h.csv"),
            Some(("g1".to_string(), GroupArtifact::Data))
        );
        assert_eq!(classify_group_key("g1/data/a.nc"), None);
        assert_eq!(classify_group_key("loose.csv"), None);
    }
}
