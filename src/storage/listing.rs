//! Paginated listing responses and the storage backend seam.

use std::path::Path;

use serde::Deserialize;

use super::object::ObjectRef;
use crate::error::{Error, Result};

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Leaf objects on this page.
    #[serde(default)]
    pub items: Vec<ListedItem>,
    /// Sub-prefixes ("folders") on this page, each ending in the delimiter.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Token for the next page, absent on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A leaf object entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListedItem {
    /// Full object key.
    pub name: String,
}

impl ListingPage {
    /// Parse a JSON listing body.
    ///
    /// An empty body or one that is not a JSON object is a listing failure,
    /// never an empty page.
    pub fn from_json(url: &str, body: &str) -> Result<Self> {
        let failed = |reason: String| Error::StorageListingFailed {
            url: url.to_string(),
            reason,
        };

        if body.trim().is_empty() {
            return Err(failed("empty response body".to_string()));
        }
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| failed(format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(failed("response is not a JSON object".to_string()));
        }
        let mut page: Self =
            serde_json::from_value(value).map_err(|e| failed(format!("unexpected shape: {e}")))?;
        if page.next_page_token.as_deref().is_some_and(str::is_empty) {
            page.next_page_token = None;
        }
        Ok(page)
    }
}

/// Object storage operations the catalog relies on.
pub trait ObjectStore {
    /// Fetch one listing page under `prefix`.
    ///
    /// With a delimiter, keys below the next delimiter are folded into
    /// [`ListingPage::prefixes`].
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListingPage>;

    /// Copy an object's bytes to `dest`, returning the byte count.
    fn fetch(&self, object: &ObjectRef, dest: &Path) -> Result<u64>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListingPage> {
        (**self).list_page(bucket, prefix, delimiter, page_token)
    }

    fn fetch(&self, object: &ObjectRef, dest: &Path) -> Result<u64> {
        (**self).fetch(object, dest)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_page() {
        let body = r#"{
            "kind": "storage#objects",
            "prefixes": ["sanctsound/audio/ci01/sanctsound_ci01_01/"],
            "items": [{"name": "sanctsound/audio/ci01/readme.txt", "size": "12"}],
            "nextPageToken": "abc"
        }"#;
        let page = ListingPage::from_json("u", body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "sanctsound/audio/ci01/readme.txt");
        assert_eq!(page.prefixes.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_empty_listing_object() {
        let page = ListingPage::from_json("u", r#"{"kind": "storage#objects"}"#).unwrap();
        assert_eq!(page, ListingPage::default());
    }

    #[test]
    fn test_blank_token_means_last_page() {
        let page = ListingPage::from_json("u", r#"{"nextPageToken": ""}"#).unwrap();
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_void_bodies_are_failures() {
        for body in ["", "   ", "null", "[]", "not json"] {
            let err = ListingPage::from_json("https://x/o", body).unwrap_err();
            assert!(
                matches!(err, Error::StorageListingFailed { ref url, .. } if url == "https://x/o"),
                "body {body:?} gave {err}"
            );
        }
    }
}
