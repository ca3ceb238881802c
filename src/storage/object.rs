//! Object addressing: bucket + key and the URL forms derived from them.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::constants::storage::GS_SCHEME;

/// Escaped in a key path segment: everything but RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Bucket name.
    pub bucket: String,
    /// Full object key.
    pub key: String,
}

impl ObjectRef {
    /// Create a reference from bucket and key.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a `gs://bucket/key` or `https://host/bucket/key` URL.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let rest = if let Some(rest) = url.strip_prefix(GS_SCHEME) {
            rest.to_string()
        } else {
            let rest = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))?;
            let (_, path) = rest.split_once('/')?;
            let path = path.split(['?', '#']).next().unwrap_or(path);
            percent_decode_str(path).decode_utf8_lossy().into_owned()
        };

        let (bucket, key) = rest.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(bucket, key))
    }

    /// Native form, `gs://bucket/key`.
    pub fn gs_url(&self) -> String {
        format!("{GS_SCHEME}{}/{}", self.bucket, self.key)
    }

    /// Plain download form, `<base>/<bucket>/<escaped key>`.
    pub fn https_url(&self, download_base: &str) -> String {
        let key: Vec<String> = self
            .key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!(
            "{}/{}/{}",
            download_base.trim_end_matches('/'),
            self.bucket,
            key.join("/")
        )
    }

    /// Last path component of the key.
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Lower-cased extension including the dot, e.g. `.csv`.
    pub fn extension(&self) -> Option<String> {
        let name = self.basename();
        name.rfind('.')
            .filter(|&i| i > 0)
            .map(|i| name[i..].to_ascii_lowercase())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.gs_url())
    }
}

/// Basename of any URL or path string.
pub fn basename_of(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gs_url() {
        let obj = ObjectRef::parse("gs://noaa-passive-bioacoustic/sanctsound/audio/ci01/a.flac")
            .unwrap();
        assert_eq!(obj.bucket, "noaa-passive-bioacoustic");
        assert_eq!(obj.key, "sanctsound/audio/ci01/a.flac");
        assert_eq!(obj.basename(), "a.flac");
    }

    #[test]
    fn test_parse_https_url_decodes_key() {
        let obj = ObjectRef::parse("https://storage.googleapis.com/bucket/dir/a%20b.csv").unwrap();
        assert_eq!(obj.bucket, "bucket");
        assert_eq!(obj.key, "dir/a b.csv");
    }

    #[test]
    fn test_parse_rejects_bare_bucket() {
        assert!(ObjectRef::parse("gs://bucket").is_none());
        assert!(ObjectRef::parse("gs://bucket/").is_none());
        assert!(ObjectRef::parse("/local/file.flac").is_none());
    }

    #[test]
    fn test_url_forms() {
        let obj = ObjectRef::new("bucket", "dir/a b+c.flac");
        assert_eq!(obj.gs_url(), "gs://bucket/dir/a b+c.flac");
        assert_eq!(
            obj.https_url("https://storage.googleapis.com/"),
            "https://storage.googleapis.com/bucket/dir/a%20b%2Bc.flac"
        );
        assert_eq!(
            ObjectRef::parse(&obj.https_url("https://storage.googleapis.com")).unwrap(),
            obj
        );
    }

    #[test]
    fn test_non_ascii_key_round_trips() {
        let obj = ObjectRef::new("bucket", "dir/Baie_é 1/x%y.flac");
        let url = obj.https_url("https://storage.googleapis.com");
        assert_eq!(
            url,
            "https://storage.googleapis.com/bucket/dir/Baie_%C3%A9%201/x%25y.flac"
        );
        assert_eq!(ObjectRef::parse(&url).unwrap(), obj);
    }

    #[test]
    fn test_extension_is_lowercase() {
        assert_eq!(
            ObjectRef::new("b", "x/Det_1h.CSV").extension().as_deref(),
            Some(".csv")
        );
        assert_eq!(ObjectRef::new("b", "x/README").extension(), None);
    }
}
