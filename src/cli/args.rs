//! CLI argument definitions.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use super::validators::{parse_site, parse_utc_bound};
use crate::constants::storage::DEFAULT_MAX_JSON_PER_GROUP;
use crate::utils::TimeInstant;

/// Cut audio clips from SanctSound recordings matching detection products.
#[derive(Debug, Parser)]
#[command(name = "sanctclip")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: platform config dir).
    #[arg(long, global = true, env = "SANCTCLIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only show warnings and errors; hides progress bars.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build windows for a detection product and select covering recordings.
    Preview(PreviewArgs),
    /// List a deployment folder's recordings within a time range.
    ListAudio(ListAudioArgs),
    /// Compare a preview's selection against a list of expected files.
    VerifyExpected(VerifyArgs),
    /// Preview, download the selection and cut one clip per window.
    Clip(ClipArgs),
    /// List detection product groups for a site.
    Groups {
        /// Site code or label (e.g. ci01).
        #[arg(long, value_parser = parse_site)]
        site: String,
        /// Only groups whose artifacts contain this text.
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// List known sites.
    Sites {
        /// List the sites that have detection products in the bucket instead.
        #[arg(long)]
        discover: bool,
    },
    /// Summarise deployment metadata published with the detection products.
    Metadata(MetadataArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Site and detection set shared by the group-driven commands.
#[derive(Debug, Args)]
pub struct GroupArgs {
    /// Site code or label (e.g. ci01 or "Channel Islands - CI01").
    #[arg(long, value_parser = parse_site)]
    pub site: String,

    /// Detection set or product group name (e.g. dolphins_1h).
    #[arg(long)]
    pub set: String,

    /// Keep only hour runs of at least `windows.min_run_hours`.
    #[arg(long)]
    pub only_long_runs: bool,
}

/// Arguments for the preview subcommand.
#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Site, set and window options.
    #[command(flatten)]
    pub group: GroupArgs,

    /// Destination directory for downloads.
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Write debug trace files to this directory.
    #[arg(long)]
    pub dump_debug: Option<PathBuf>,

    /// Stop before downloading the selected recordings.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub dry_run: bool,
}

/// Arguments for the list-audio subcommand.
#[derive(Debug, Args)]
pub struct ListAudioArgs {
    /// Site code or label.
    #[arg(long, value_parser = parse_site)]
    pub site: String,

    /// Deployment folder (e.g. sanctsound_ci01_01).
    #[arg(long)]
    pub folder: String,

    /// Earliest start, YYYY-MM-DDTHH:MM:SSZ.
    #[arg(long, value_parser = parse_utc_bound)]
    pub tmin: Option<TimeInstant>,

    /// Latest start, YYYY-MM-DDTHH:MM:SSZ.
    #[arg(long, value_parser = parse_utc_bound)]
    pub tmax: Option<TimeInstant>,

    /// File receiving one URL per line.
    #[arg(long)]
    pub dump: PathBuf,
}

/// Arguments for the verify-expected subcommand.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Site, set and window options.
    #[command(flatten)]
    pub group: GroupArgs,

    /// File listing expected recording names, one per line.
    #[arg(long)]
    pub expect: PathBuf,

    /// Directory receiving debug files and the verification report.
    #[arg(long)]
    pub dump_debug: PathBuf,

    /// Destination for the detection CSVs (default: the debug directory).
    #[arg(long)]
    pub dest: Option<PathBuf>,
}

/// Arguments for the clip subcommand.
#[derive(Debug, Args)]
pub struct ClipArgs {
    /// Site code or label.
    #[arg(long, value_parser = parse_site)]
    pub site: String,

    /// Detection sets to clip; repeat for several groups.
    #[arg(long = "set", required = true)]
    pub sets: Vec<String>,

    /// Destination directory for downloads and clips.
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Write debug trace files to this directory.
    #[arg(long)]
    pub dump_debug: Option<PathBuf>,

    /// Keep only hour runs of at least `windows.min_run_hours`.
    #[arg(long)]
    pub only_long_runs: bool,
}

/// Arguments for the metadata subcommand.
#[derive(Debug, Args)]
pub struct MetadataArgs {
    /// Sites to scan; repeat for several (default: every site with products).
    #[arg(long = "site", value_parser = parse_site)]
    pub sites: Vec<String>,

    /// Destination directory for the metadata cache and index.
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Index file (default: metadata_index.json under the destination).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Metadata documents read per product group.
    #[arg(long, default_value_t = DEFAULT_MAX_JSON_PER_GROUP)]
    pub max_json: usize,
}
