//! Shared fixtures: an in-memory object store and WAV builders.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use chrono::{TimeZone, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};
use sanctclip::error::{Error, Result};
use sanctclip::storage::{ListedItem, ListingPage, ObjectRef, ObjectStore};
use sanctclip::utils::TimeInstant;

/// Sample rate used by every fixture recording.
pub const RATE: u32 = 100;

/// Objects keyed by name, listed `page_size` entries at a time.
pub struct MemoryStore {
    pub objects: BTreeMap<String, Vec<u8>>,
    pub page_size: usize,
    pub fetched: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: BTreeMap::new(),
            page_size,
            fetched: RefCell::new(Vec::new()),
        }
    }

    pub fn insert(&mut self, key: &str, bytes: Vec<u8>) {
        self.objects.insert(key.to_string(), bytes);
    }
}

impl ObjectStore for MemoryStore {
    fn list_page(
        &self,
        _bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListingPage> {
        // Entries in key order: (is_prefix, name)
        let mut entries: Vec<(bool, String)> = Vec::new();
        for key in self.objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    let child = format!("{prefix}{}", &rest[..end]);
                    if !entries.iter().any(|(p, n)| *p && *n == child) {
                        entries.push((true, child));
                    }
                }
                None => entries.push((false, key.clone())),
            }
        }

        let offset: usize = page_token.map_or(0, |t| t.parse().unwrap());
        let end = (offset + self.page_size).min(entries.len());
        let mut page = ListingPage::default();
        for (is_prefix, name) in &entries[offset..end] {
            if *is_prefix {
                page.prefixes.push(name.clone());
            } else {
                page.items.push(ListedItem { name: name.clone() });
            }
        }
        if end < entries.len() {
            page.next_page_token = Some(end.to_string());
        }
        Ok(page)
    }

    fn fetch(&self, object: &ObjectRef, dest: &Path) -> Result<u64> {
        let bytes = self
            .objects
            .get(&object.key)
            .ok_or_else(|| Error::DownloadFailed {
                url: object.gs_url(),
                source: "no such object".into(),
            })?;
        std::fs::write(dest, bytes)?;
        self.fetched.borrow_mut().push(object.key.clone());
        Ok(bytes.len() as u64)
    }
}

pub fn at(h: u32, m: u32) -> TimeInstant {
    Utc.with_ymd_and_hms(2021, 1, 1, h, m, 0).unwrap()
}

/// Mono 16-bit WAV whose sample value encodes the second it was recorded at.
pub fn wav_bytes(secs: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..secs * RATE {
            writer.write_sample(second_marker(i / RATE)).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn write_wav(path: &Path, secs: u32) {
    std::fs::write(path, wav_bytes(secs)).unwrap();
}

/// Sample value written for second `s` of a fixture recording.
pub fn second_marker(s: u32) -> i16 {
    (s % 30_000) as i16
}

/// All samples of a WAV file.
pub fn read_samples(path: &Path) -> Vec<i16> {
    let mut reader = hound::WavReader::open(path).unwrap();
    reader.samples::<i16>().map(|s| s.unwrap()).collect()
}

/// A misbehaving backend: every page lists the prefix itself and `root/`
/// as children, and every page hands back the same continuation token.
#[derive(Default)]
pub struct CyclicStore {
    pub calls: RefCell<Vec<(String, Option<String>)>>,
}

impl ObjectStore for CyclicStore {
    fn list_page(
        &self,
        _bucket: &str,
        prefix: &str,
        _delimiter: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListingPage> {
        self.calls
            .borrow_mut()
            .push((prefix.to_string(), page_token.map(str::to_string)));
        let page = page_token.unwrap_or("first");
        Ok(ListingPage {
            items: vec![ListedItem {
                name: format!("{prefix}obj_{page}.csv"),
            }],
            prefixes: vec![
                prefix.to_string(),
                "root/".to_string(),
                "root/child/".to_string(),
            ],
            next_page_token: Some("again".to_string()),
        })
    }

    fn fetch(&self, object: &ObjectRef, _dest: &Path) -> Result<u64> {
        Err(Error::DownloadFailed {
            url: object.gs_url(),
            source: "not fetchable".into(),
        })
    }
}
