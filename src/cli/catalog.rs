//! Groups, sites and metadata listings.

#![allow(clippy::print_stdout)]

use super::{MetadataArgs, open_catalog, resolve_destination};
use crate::config::Config;
use crate::constants::storage::{METADATA_DIR, METADATA_INDEX_FILE};
use crate::detections::{DeploymentMetadata, ProductGroup};
use crate::error::Result;
use crate::utils::sites;

/// Print the product groups found for `site`.
pub fn run_groups(site: &str, tag: &str, config: &Config) -> Result<()> {
    let catalog = open_catalog(config, false)?;
    let groups = catalog.list_product_groups(site, tag)?;
    if groups.is_empty() {
        println!("No product groups found for {site}.");
        return Ok(());
    }
    for group in &groups {
        println!("{}", describe_group(group));
    }
    Ok(())
}

/// Print every known site label.
pub fn run_sites() {
    for label in sites::all_labels() {
        println!("{label}");
    }
}

/// Print the sites that have detection products in the bucket.
pub fn run_discover_sites(config: &Config) -> Result<()> {
    let catalog = open_catalog(config, false)?;
    let codes = catalog.discover_sites()?;
    if codes.is_empty() {
        println!("No sites found under the detection products.");
    }
    for code in codes {
        println!("{}", sites::label_for_code(&code));
    }
    Ok(())
}

/// Build, save and print the deployment metadata index.
pub fn run_metadata(args: MetadataArgs, config: &Config, show_progress: bool) -> Result<()> {
    let dest = resolve_destination(args.dest, config)?;
    let catalog = open_catalog(config, show_progress)?;
    let sites = if args.sites.is_empty() {
        catalog.discover_sites()?
    } else {
        args.sites
    };

    let index =
        catalog.build_metadata_index(&sites, &dest.root().join(METADATA_DIR), args.max_json)?;
    let out = args.out.unwrap_or_else(|| dest.root().join(METADATA_INDEX_FILE));
    index.save(&out)?;

    for (code, site) in &index.sites {
        println!("{}", site.label);
        for (number, deployment) in &site.deployments {
            println!("  {}", describe_deployment(code, number, deployment));
        }
    }
    println!(
        "{} deployment(s) across {} site(s) -> {}",
        index.deployment_count(),
        index.sites.len(),
        out.display()
    );
    Ok(())
}

/// `ci01 02  label  lat, lon  start .. end  rate  json:n csv:n`
fn describe_deployment(code: &str, number: &str, deployment: &DeploymentMetadata) -> String {
    let or_dash = |value: Option<&str>| value.unwrap_or("-").to_string();
    let rate = deployment
        .sample_rate_hz
        .map_or_else(|| "-".to_string(), |hz| format!("{hz} Hz"));
    format!(
        "{code} {number}  {}  [{}]  {} .. {}  {rate}  json:{} csv:{}",
        or_dash(deployment.label.as_deref()),
        deployment.coordinates(),
        or_dash(deployment.start_utc.as_deref()),
        or_dash(deployment.end_utc.as_deref()),
        deployment.json_urls.len(),
        deployment.csv_count
    )
}

/// `name  MODE  n file(s) [.csv:2 .nc:1]`
fn describe_group(group: &ProductGroup) -> String {
    let counts: Vec<String> = group
        .extension_counts
        .iter()
        .map(|(ext, n)| format!("{ext}:{n}"))
        .collect();
    format!(
        "{:<40} {:<5} {} file(s) [{}]",
        group.name,
        group.mode.to_string(),
        group.source_paths.len(),
        counts.join(" ")
    )
}
