//! Error types for sanctclip.

use std::path::PathBuf;

/// Result type alias for sanctclip operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for sanctclip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Text could not be read as a timestamp in any supported encoding.
    #[error("not a timestamp: '{text}'")]
    NotATimestamp {
        /// The rejected text.
        text: String,
    },

    /// A path that must be a directory exists as something else.
    #[error("destination exists but is not a directory: {path}")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory '{path}'")]
    DirectoryCreate {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to open a file for writing.
    #[error("failed to open file for writing '{path}'")]
    FileCreate {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Object listing request failed or returned an unusable body.
    #[error("storage listing failed for '{url}': {reason}")]
    StorageListingFailed {
        /// Listing URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// Download failed.
    #[error("failed to download from '{url}'")]
    DownloadFailed {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP client or async runtime could not be constructed.
    #[error("failed to initialise HTTP client: {reason}")]
    HttpClient {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to read a detection CSV.
    #[error("failed to read detection file '{path}'")]
    CsvRead {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Required CSV columns could not be identified.
    #[error("{message} in {path}")]
    ColumnDetection {
        /// Path to the CSV file.
        path: PathBuf,
        /// Which roles were missing.
        message: String,
    },

    /// A product group had no CSV artifact to read.
    #[error("product group '{group}' has no CSV artifacts")]
    NoCsvArtifacts {
        /// Group name.
        group: String,
    },

    /// No product group matched the requested set.
    #[error("no product group matched set '{set}' at site '{site}'")]
    ProductGroupNotFound {
        /// Site code.
        site: String,
        /// Requested set name.
        set: String,
    },

    /// Failed to open audio file.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: PathBuf,
    },

    /// Failed to write WAV file.
    #[error("failed to write WAV file '{path}'")]
    WavWriteFailed {
        /// Path to the WAV file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: hound::Error,
    },

    /// External media tool exited unsuccessfully.
    #[error("{tool} failed with exit code {exit_code}.\n{output}{hint}")]
    ToolFailed {
        /// Tool name.
        tool: String,
        /// Exit code (-1 when the process was killed by a signal).
        exit_code: i32,
        /// Captured stdout + stderr.
        output: String,
        /// Remediation hint, possibly empty.
        hint: String,
    },

    /// External media tool did not finish in time.
    #[error("{tool} did not finish within {timeout_secs}s and was killed")]
    ToolTimeout {
        /// Tool name.
        tool: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// External media tool could not be started.
    #[error("failed to start {tool}. Ensure `{tool}` is installed and on your PATH")]
    ToolSpawn {
        /// Tool name.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two recordings to be spliced differ in sample rate or channel count.
    #[error(
        "cannot splice '{primary}' ({primary_rate} Hz, {primary_channels} ch) with '{secondary}' ({secondary_rate} Hz, {secondary_channels} ch)"
    )]
    FormatMismatch {
        /// Primary recording name.
        primary: String,
        /// Primary sample rate.
        primary_rate: u32,
        /// Primary channel count.
        primary_channels: u16,
        /// Secondary recording name.
        secondary: String,
        /// Secondary sample rate.
        secondary_rate: u32,
        /// Secondary channel count.
        secondary_channels: u16,
    },

    /// A splice source whose sample rate or channel count is unknown.
    #[error("cannot splice '{name}': sample rate and channel count are unknown")]
    FormatUnknown {
        /// Recording name.
        name: String,
    },

    /// A metadata document is not valid JSON.
    #[error("failed to parse metadata document '{path}'")]
    MetadataParse {
        /// Local copy of the document.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to acquire lock.
    #[error("directory is locked by {holder}: {path}")]
    FileLocked {
        /// Path to the lock file.
        path: PathBuf,
        /// Who holds it, as far as the lock file tells.
        holder: String,
    },

    /// Failed to create lock file.
    #[error("failed to create lock file '{path}'")]
    LockCreate {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove lock file.
    #[error("failed to remove lock file '{path}'")]
    LockRemove {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A clip run produced no clip at all.
    #[error(
        "no usable audio produced: 0 of {total_windows} windows written across {groups} group(s); check site, deployment and detection product"
    )]
    NoUsableAudio {
        /// Number of groups processed.
        groups: usize,
        /// Number of windows attempted.
        total_windows: usize,
    },

    /// Expected basenames differ from the selected ones.
    #[error("verification failed: {missing} missing, {unexpected} unexpected (see {report})")]
    VerificationFailed {
        /// Count of expected names not selected.
        missing: usize,
        /// Count of selected names not expected.
        unexpected: usize,
        /// Path to the written diff report.
        report: PathBuf,
    },

    /// Failed to read an expected-basenames list.
    #[error("failed to read expected list '{path}'")]
    ExpectedListRead {
        /// Path to the list.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
