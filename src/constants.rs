//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "sanctclip";

/// Lock file name placed inside a clip directory while a run writes to it.
pub const LOCK_FILE_NAME: &str = ".sanctclip.lock";

/// Object storage defaults.
pub mod storage {
    /// Public bucket holding the archive.
    pub const DEFAULT_BUCKET: &str = "noaa-passive-bioacoustic";

    /// Prefix under which raw audio lives, one folder per site.
    pub const DEFAULT_AUDIO_PREFIX: &str = "sanctsound/audio";

    /// Prefix under which detection products live, one folder per site.
    pub const DEFAULT_PRODUCTS_PREFIX: &str = "sanctsound/products/detections";

    /// JSON listing API root.
    pub const DEFAULT_API_BASE: &str = "https://storage.googleapis.com/storage/v1";

    /// Plain HTTPS download root.
    pub const DEFAULT_DOWNLOAD_BASE: &str = "https://storage.googleapis.com";

    /// Delimiter giving folder semantics to listings.
    pub const DELIMITER: &str = "/";

    /// Native URL scheme.
    pub const GS_SCHEME: &str = "gs://";

    /// Connection timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

    /// Whole-request timeout for listing pages in seconds.
    pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 60;

    /// Whole-request timeout for object downloads in seconds.
    pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

    /// Deployment folder prefix.
    pub const DEPLOYMENT_PREFIX: &str = "sanctsound_";

    /// Sub-folder of a deployment holding recordings.
    pub const AUDIO_FOLDER: &str = "audio";

    /// Recording extensions recognised in listings.
    pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "wav"];

    /// Product artifact preference order.
    pub const PRODUCT_PREFERENCE: &[&str] = &[".csv", ".nc", ".json"];

    /// Metadata documents read per product group when indexing metadata.
    pub const DEFAULT_MAX_JSON_PER_GROUP: usize = 3;

    /// Metadata index file written under the destination.
    pub const METADATA_INDEX_FILE: &str = "metadata_index.json";

    /// Cache folder for metadata documents under the destination.
    pub const METADATA_DIR: &str = "metadata";
}

/// Coverage policy defaults.
pub mod matching {
    /// A recording starting before the earliest window is kept only within this many hours.
    pub const DEFAULT_LEFT_BOUNDARY_HOURS: f64 = 6.0;

    /// Length assumed for a recording whose real duration is unknown.
    pub const DEFAULT_SPAN_SECS: u64 = 3600;

    /// Minimum span length when the next recording starts at the same instant.
    pub const MIN_SPAN_MILLIS: i64 = 1000;
}

/// Window building defaults.
pub mod windows {
    /// Event length used when neither an end nor a positive duration is present.
    pub const DEFAULT_EVENT_FALLBACK_SECS: f64 = 60.0;

    /// Shortest hour run kept when long-run filtering is on.
    pub const DEFAULT_MIN_RUN_HOURS: u32 = 2;

    /// Tolerance when testing whether two hours are consecutive.
    pub const RUN_GAP_TOLERANCE_MILLIS: i64 = 1;

    /// Minimum fraction of rows that must parse for an HOUR timestamp column.
    pub const HOUR_TIMESTAMP_FRACTION: f64 = 0.1;

    /// Minimum fraction of rows that must parse for a DAY/EVENT timestamp column.
    pub const DEFAULT_TIMESTAMP_FRACTION: f64 = 0.05;

    /// Absolute floor on parsed cells for a timestamp column.
    pub const MIN_TIMESTAMP_CELLS: usize = 3;

    /// Product name suffix selecting HOUR mode.
    pub const HOUR_SUFFIX: &str = "_1h";

    /// Product name suffix selecting DAY mode.
    pub const DAY_SUFFIX: &str = "_1d";
}

/// Column-role keywords for detection CSVs.
pub mod columns {
    /// Header fragments hinting at a presence flag.
    pub const PRESENCE_HINTS: &[&str] = &["presence", "present", "detect", "call", "occur"];

    /// Header fragments marking an explicit end time.
    pub const END_HINTS: &[&str] = &["end", "stop", "finish"];

    /// Header fragments marking a duration.
    pub const DURATION_HINTS: &[&str] = &["duration", "dur", "length"];
}

/// Clipper constants for clip extraction.
pub mod clipper {
    /// Clips smaller than this are treated as failed and removed.
    pub const DEFAULT_MIN_CLIP_BYTES: u64 = 10_000;

    /// Timeout for one external media tool invocation in seconds.
    pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

    /// Minimum start offset (in seconds) before seeking is attempted.
    /// For cuts starting before this threshold, we decode from the beginning.
    pub const SEEK_THRESHOLD_SECS: f64 = 10.0;

    /// Bits per output sample.
    pub const OUTPUT_BITS_PER_SAMPLE: u16 = 16;

    /// Sub-directory of the destination holding per-group clip folders.
    pub const CLIPS_DIR: &str = "clips";

    /// Manifest file name.
    pub const MANIFEST_FILE: &str = "clips_manifest.csv";

    /// Summary file name.
    pub const SUMMARY_FILE: &str = "clips_summary.txt";

    /// Separator between source names in the manifest.
    pub const SOURCE_SEPARATOR: &str = " + ";

    /// Default ffmpeg program.
    pub const DEFAULT_FFMPEG: &str = "ffmpeg";

    /// Default ffprobe program.
    pub const DEFAULT_FFPROBE: &str = "ffprobe";

    /// Clip directory locks older than this many hours are taken over.
    pub const DEFAULT_LOCK_MAX_AGE_HOURS: u64 = 24;
}

/// Debug sink file names.
pub mod debug_files {
    /// Raw listing lines.
    pub const FOLDER_LISTINGS: &str = "debug_all_listing.txt";
    /// Candidate URLs.
    pub const CANDIDATE_URLS: &str = "debug_candidates_urls.txt";
    /// Candidate basenames.
    pub const CANDIDATE_NAMES: &str = "debug_candidates_fnames.txt";
    /// Selected URLs.
    pub const SELECTED_URLS: &str = "debug_selected_urls.txt";
    /// Selected basenames.
    pub const SELECTED_NAMES: &str = "debug_selected_fnames.txt";
    /// Free-form explanation log.
    pub const EXPLAIN: &str = "debug_explain.txt";
    /// Tab-separated window table.
    pub const WINDOWS_TSV: &str = "debug_windows.tsv";
    /// Expected-vs-selected diff.
    pub const EXPECTED_VS_SELECTED: &str = "debug_expected_vs_selected.txt";
}
