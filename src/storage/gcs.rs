//! HTTP backend for Google Cloud Storage public buckets.
//!
//! Listing goes through the JSON API; object bytes come from the plain
//! HTTPS download host. Both run on a private tokio runtime so callers stay
//! synchronous.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;
use tracing::debug;

use super::listing::{ListingPage, ObjectStore};
use super::object::ObjectRef;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::output::progress;

/// Anonymous GCS client.
pub struct GcsClient {
    runtime: Runtime,
    client: Client,
    api_base: String,
    download_base: String,
    listing_timeout: Duration,
    download_timeout: Duration,
    show_progress: bool,
}

impl GcsClient {
    /// Build a client from storage settings.
    pub fn new(config: &StorageConfig, show_progress: bool) -> Result<Self> {
        let runtime = Runtime::new().map_err(|e| Error::HttpClient {
            reason: format!("failed to create async runtime: {e}"),
        })?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| Error::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            runtime,
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            download_base: config.download_base.trim_end_matches('/').to_string(),
            listing_timeout: config.listing_timeout(),
            download_timeout: config.download_timeout(),
            show_progress,
        })
    }

    /// Listing URL for one page.
    pub fn listing_url(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Url> {
        let mut params = vec![("prefix", prefix)];
        if let Some(delimiter) = delimiter {
            params.push(("delimiter", delimiter));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let base = format!("{}/b/{bucket}/o", self.api_base);
        Url::parse_with_params(&base, &params).map_err(|e| Error::StorageListingFailed {
            url: base.clone(),
            reason: format!("invalid listing URL: {e}"),
        })
    }

    async fn get_listing_body(&self, url: Url) -> Result<String> {
        let failed = |reason: String| Error::StorageListingFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(self.listing_timeout)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| failed(e.to_string()))
    }
}

impl ObjectStore for GcsClient {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListingPage> {
        let url = self.listing_url(bucket, prefix, delimiter, page_token)?;
        debug!("GET {url}");
        let body = self.runtime.block_on(self.get_listing_body(url.clone()))?;
        ListingPage::from_json(url.as_str(), &body)
    }

    fn fetch(&self, object: &ObjectRef, dest: &Path) -> Result<u64> {
        let url = object.https_url(&self.download_base);
        debug!("GET {url}");
        self.runtime.block_on(download_file(
            &self.client,
            &url,
            dest,
            self.download_timeout,
            self.show_progress,
        ))
    }
}

/// Stream a URL to `dest` with an optional progress bar.
///
/// Bytes land in a `.part` sibling first and are renamed into place only
/// once the body has been fully written.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
    show_progress: bool,
) -> Result<u64> {
    let failed = |source: Box<dyn std::error::Error + Send + Sync>| Error::DownloadFailed {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| failed(Box::new(e)))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status()).into()));
    }

    let total_size = response.content_length().unwrap_or(0);
    let name = dest
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy());
    let pb = progress::create_transfer_progress(total_size, &name, show_progress);

    let part = part_path(dest);
    let mut file = File::create(&part).await.map_err(|e| Error::FileCreate {
        path: part.clone(),
        source: e,
    })?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                return Err(failed(Box::new(e)));
            }
        };

        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            let _ = tokio::fs::remove_file(&part).await;
            return Err(failed(Box::new(e)));
        }

        downloaded += chunk.len() as u64;
        progress::set_progress(pb.as_ref(), downloaded);
    }

    file.flush().await.map_err(|e| failed(Box::new(e)))?;
    drop(file);
    tokio::fs::rename(&part, dest)
        .await
        .map_err(|e| failed(Box::new(e)))?;

    progress::finish_progress(pb, "Download complete");
    Ok(downloaded)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_encodes_parameters() {
        let client = GcsClient::new(&StorageConfig::default(), false).unwrap();
        let url = client
            .listing_url(
                "noaa-passive-bioacoustic",
                "sanctsound/audio/ci01/",
                Some("/"),
                Some("tok en"),
            )
            .unwrap();

        assert_eq!(
            url.path(),
            "/storage/v1/b/noaa-passive-bioacoustic/o"
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("prefix".to_string(), "sanctsound/audio/ci01/".to_string()),
                ("delimiter".to_string(), "/".to_string()),
                ("pageToken".to_string(), "tok en".to_string()),
            ]
        );
    }

    #[test]
    fn test_listing_url_without_delimiter_or_token() {
        let client = GcsClient::new(&StorageConfig::default(), false).unwrap();
        let url = client.listing_url("b", "p/", None, None).unwrap();
        assert_eq!(url.query(), Some("prefix=p%2F"));
    }

    #[test]
    fn test_part_path_is_sibling() {
        assert_eq!(
            part_path(Path::new("/data/a.flac")),
            PathBuf::from("/data/a.flac.part")
        );
    }
}
