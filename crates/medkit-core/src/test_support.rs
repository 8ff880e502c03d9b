//! In-memory collaborators for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::checksum::StreamHasher;
use crate::control::CancelToken;
use crate::downloader::Downloader;
use crate::extract::{ExtractOptions, ExtractReport, ExtractionError, Extractor};
use crate::fetch_head::HeadResult;
use crate::retry::TransferError;
use crate::url_model;

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Every collaborator call in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Head(String),
    Download(String),
    Extract { archive: PathBuf, dest: PathBuf },
}

/// Serves registered URLs from memory into a temp cache dir and records calls.
pub(crate) struct MemoryDownloader {
    cache: tempfile::TempDir,
    files: HashMap<String, Vec<u8>>,
    head_error: Option<u32>,
    calls: RefCell<Vec<Call>>,
}

impl MemoryDownloader {
    pub(crate) fn new() -> Self {
        Self {
            cache: tempfile::tempdir().expect("temp cache dir"),
            files: HashMap::new(),
            head_error: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn serve(mut self, url: &str, body: &[u8]) -> Self {
        self.files.insert(url.to_string(), body.to_vec());
        self
    }

    /// Make every HEAD fail with `status`.
    pub(crate) fn head_fails_with(mut self, status: u32) -> Self {
        self.head_error = Some(status);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn path_for(&self, url: &str) -> PathBuf {
        self.cache.path().join(url_model::derive_filename(url))
    }

    pub(crate) fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Downloader for MemoryDownloader {
    fn head(&self, url: &str, cancel: &CancelToken) -> Result<HeadResult, TransferError> {
        if cancel.is_cancelled() {
            return Err(TransferError::Aborted);
        }
        self.record(Call::Head(url.to_string()));
        if let Some(status) = self.head_error {
            return Err(TransferError::Http(status));
        }
        match self.files.get(url) {
            Some(body) => Ok(HeadResult {
                status: 200,
                content_length: Some(body.len() as u64),
                ..HeadResult::default()
            }),
            None => Err(TransferError::Http(404)),
        }
    }

    fn download(
        &self,
        url: &str,
        hasher: Option<&mut StreamHasher>,
        cancel: &CancelToken,
    ) -> Result<PathBuf, TransferError> {
        if cancel.is_cancelled() {
            return Err(TransferError::Aborted);
        }
        self.record(Call::Download(url.to_string()));
        let body = self.files.get(url).ok_or(TransferError::Http(404))?;
        if let Some(h) = hasher {
            h.update(body);
        }
        let path = self.path_for(url);
        fs::write(&path, body)?;
        Ok(path)
    }
}

/// Extractor that records its calls into a shared `MemoryDownloader` log
/// and writes a marker file instead of decoding anything.
pub(crate) struct RecordingExtractor<'a> {
    log: &'a MemoryDownloader,
    fail: bool,
}

impl<'a> RecordingExtractor<'a> {
    pub(crate) fn new(log: &'a MemoryDownloader) -> Self {
        Self { log, fail: false }
    }

    pub(crate) fn failing(log: &'a MemoryDownloader) -> Self {
        Self { log, fail: true }
    }
}

impl Extractor for RecordingExtractor<'_> {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractReport, ExtractionError> {
        assert_eq!(*options, ExtractOptions::default());
        self.log.record(Call::Extract {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        if self.fail {
            return Err(ExtractionError::EmptyArchive);
        }
        fs::write(dest.join(".extracted"), b"")?;
        Ok(ExtractReport { entries: 1 })
    }
}
