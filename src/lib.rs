//! Sanctclip - clips from SanctSound recordings that match detection products.
//!
//! This crate turns detection CSVs (hourly, daily or per-event presence
//! tables) into UTC time windows, finds the archived recordings covering
//! each window, and cuts one exact clip per window.

#![warn(missing_docs)]

pub mod audio;
pub mod cli;
pub mod clipper;
pub mod config;
pub mod constants;
pub mod coverage;
pub mod detections;
pub mod error;
pub mod locking;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod utils;
pub mod windows;

use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Command};
use config::{Config, config_file_path, load_config, save_config};
use std::path::Path;
use tracing::warn;

pub use error::{Error, Result};

/// Main entry point for the sanctclip CLI.
///
/// Usage errors exit with status 1; help and version exit with 0.
pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose, cli.quiet);

    // Install Ctrl+C handler to clean up lock files on interrupt
    if let Err(e) = ctrlc::set_handler(|| {
        locking::cleanup_all_locks();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    handle_command(cli.command, cli.config.as_deref(), !cli.quiet)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config actions run without loading the file so a broken one can be located.
fn handle_command(command: Command, explicit: Option<&Path>, show_progress: bool) -> Result<()> {
    let config = || load_config(explicit);
    match command {
        Command::Preview(args) => cli::preview::run_preview(args, &config()?, show_progress),
        Command::ListAudio(args) => cli::audio::run_list_audio(args, &config()?, show_progress),
        Command::VerifyExpected(args) => cli::preview::run_verify(args, &config()?, show_progress),
        Command::Clip(args) => cli::clip::run_clip(args, &config()?, show_progress),
        Command::Groups { site, tag } => cli::catalog::run_groups(&site, &tag, &config()?),
        Command::Sites { discover: false } => {
            cli::catalog::run_sites();
            Ok(())
        }
        Command::Sites { discover: true } => cli::catalog::run_discover_sites(&config()?),
        Command::Metadata(args) => cli::catalog::run_metadata(args, &config()?, show_progress),
        Command::Config { action } => handle_config_command(action, explicit),
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: cli::ConfigAction, explicit: Option<&Path>) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => config_file_path()?,
            };
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  sanctclip sites");
                println!("  sanctclip groups --site ci01");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            let text = toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize {
                source: e,
            })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => config_file_path()?,
            };
            println!("{}", path.display());
            Ok(())
        }
    }
}
