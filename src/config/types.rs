//! Configuration type definitions.

use crate::constants::{clipper, matching, storage, windows};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bucket layout and network settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Recording-to-window matching policy.
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Window building policy.
    #[serde(default)]
    pub windows: WindowsConfig,

    /// Clip extraction settings.
    #[serde(default)]
    pub clips: ClipsConfig,

    /// Default command settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Where the archive lives and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket name.
    pub bucket: String,

    /// Prefix holding `<site>/<deployment>/audio/` folders.
    pub audio_prefix: String,

    /// Prefix holding `<site>/<group>/` detection products.
    pub products_prefix: String,

    /// JSON listing API root.
    pub api_base: String,

    /// HTTPS download root.
    pub download_base: String,

    /// Optional local mirror laid out as `<root>/<bucket>/<key>`.
    pub mirror_root: Option<PathBuf>,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for a listing page in seconds.
    pub listing_timeout_secs: u64,

    /// Whole-request timeout for one object download in seconds.
    pub download_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: storage::DEFAULT_BUCKET.to_string(),
            audio_prefix: storage::DEFAULT_AUDIO_PREFIX.to_string(),
            products_prefix: storage::DEFAULT_PRODUCTS_PREFIX.to_string(),
            api_base: storage::DEFAULT_API_BASE.to_string(),
            download_base: storage::DEFAULT_DOWNLOAD_BASE.to_string(),
            mirror_root: None,
            connect_timeout_secs: storage::DEFAULT_CONNECT_TIMEOUT_SECS,
            listing_timeout_secs: storage::DEFAULT_LISTING_TIMEOUT_SECS,
            download_timeout_secs: storage::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl StorageConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Listing timeout as a [`Duration`].
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    /// Download timeout as a [`Duration`].
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Coverage policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// How far before the earliest window a recording may start and still be
    /// kept as the left-boundary candidate.
    pub left_boundary_hours: f64,

    /// Span length assumed for a recording whose duration is unknown.
    pub default_span_secs: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            left_boundary_hours: matching::DEFAULT_LEFT_BOUNDARY_HOURS,
            default_span_secs: matching::DEFAULT_SPAN_SECS,
        }
    }
}

/// Window building policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    /// Event length when no end or positive duration is available.
    pub event_fallback_secs: f64,

    /// Drop hour runs shorter than `min_run_hours`.
    pub only_long_runs: bool,

    /// Shortest hour run kept when `only_long_runs` is set.
    pub min_run_hours: u32,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            event_fallback_secs: windows::DEFAULT_EVENT_FALLBACK_SECS,
            only_long_runs: false,
            min_run_hours: windows::DEFAULT_MIN_RUN_HOURS,
        }
    }
}

/// How clips are cut.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClipBackend {
    /// Decode and write samples in-process.
    #[default]
    Native,
    /// Shell out to ffmpeg.
    Ffmpeg,
}

impl std::fmt::Display for ClipBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Ffmpeg => write!(f, "ffmpeg"),
        }
    }
}

impl std::str::FromStr for ClipBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "ffmpeg" => Ok(Self::Ffmpeg),
            other => Err(format!("unknown clip backend: {other}")),
        }
    }
}

/// Clip extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    /// Cutting backend.
    pub backend: ClipBackend,

    /// Outputs smaller than this many bytes are discarded.
    pub min_clip_bytes: u64,

    /// Timeout for one external tool call in seconds.
    pub tool_timeout_secs: u64,

    /// ffmpeg program name or path.
    pub ffmpeg: String,

    /// ffprobe program name or path.
    pub ffprobe: String,

    /// Age in hours after which a clip directory lock is considered stale.
    pub lock_max_age_hours: u64,
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            backend: ClipBackend::default(),
            min_clip_bytes: clipper::DEFAULT_MIN_CLIP_BYTES,
            tool_timeout_secs: clipper::DEFAULT_TOOL_TIMEOUT_SECS,
            ffmpeg: clipper::DEFAULT_FFMPEG.to_string(),
            ffprobe: clipper::DEFAULT_FFPROBE.to_string(),
            lock_max_age_hours: clipper::DEFAULT_LOCK_MAX_AGE_HOURS,
        }
    }
}

impl ClipsConfig {
    /// Tool timeout as a [`Duration`].
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Stale-lock age as a [`Duration`].
    pub fn lock_max_age(&self) -> Duration {
        Duration::from_secs(self.lock_max_age_hours.saturating_mul(3600))
    }
}

/// Default command settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Destination directory used when `--dest` is omitted.
    pub destination: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_backend_from_str() {
        assert_eq!(
            "native".parse::<ClipBackend>().ok(),
            Some(ClipBackend::Native)
        );
        assert_eq!(
            "FFMPEG".parse::<ClipBackend>().ok(),
            Some(ClipBackend::Ffmpeg)
        );
        assert!("sox".parse::<ClipBackend>().is_err());
    }

    #[test]
    fn test_clip_backend_display() {
        assert_eq!(ClipBackend::Native.to_string(), "native");
        assert_eq!(ClipBackend::Ffmpeg.to_string(), "ffmpeg");
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.storage.bucket, "noaa-passive-bioacoustic");
        assert_eq!(config.matching.left_boundary_hours, 6.0);
        assert_eq!(config.matching.default_span_secs, 3600);
        assert_eq!(config.windows.event_fallback_secs, 60.0);
        assert_eq!(config.windows.min_run_hours, 2);
        assert!(!config.windows.only_long_runs);
        assert_eq!(config.clips.min_clip_bytes, 10_000);
        assert_eq!(config.clips.backend, ClipBackend::Native);
        assert!(config.defaults.destination.is_none());
    }
}
