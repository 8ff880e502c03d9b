//! Transport collaborator: HEAD probes and streaming GETs into a cache dir.
//!
//! The pipeline only depends on the `Downloader` trait. `CurlDownloader` is
//! the libcurl implementation; tests substitute in-memory fakes.

mod single;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::StreamHasher;
use crate::control::CancelToken;
use crate::fetch_head::{self, HeadResult};
use crate::retry::TransferError;
use crate::url_model;

/// Retrieval primitives the pipeline needs from the transport layer.
pub trait Downloader {
    /// Existence check without a body transfer.
    fn head(&self, url: &str, cancel: &CancelToken) -> Result<HeadResult, TransferError>;

    /// Download `url` into the cache and return the local path. When `hasher`
    /// is given it is fed every body byte in the same pass that writes it.
    fn download(
        &self,
        url: &str,
        hasher: Option<&mut StreamHasher>,
        cancel: &CancelToken,
    ) -> Result<PathBuf, TransferError>;
}

/// Timeouts applied to every curl handle.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock limit for a whole transfer.
    pub timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
        }
    }
}

impl TransferOptions {
    pub(crate) fn apply(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        easy.timeout(self.timeout)?;
        Ok(())
    }
}

/// libcurl-backed downloader that stores files under `cache_dir`, named after
/// the last URL path segment.
#[derive(Debug, Clone)]
pub struct CurlDownloader {
    cache_dir: PathBuf,
    options: TransferOptions,
}

impl CurlDownloader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache path a download of `url` lands at.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(url_model::derive_filename(url))
    }
}

impl Downloader for CurlDownloader {
    fn head(&self, url: &str, cancel: &CancelToken) -> Result<HeadResult, TransferError> {
        fetch_head::head(url, &self.options, cancel)
    }

    fn download(
        &self,
        url: &str,
        hasher: Option<&mut StreamHasher>,
        cancel: &CancelToken,
    ) -> Result<PathBuf, TransferError> {
        fs::create_dir_all(&self.cache_dir)?;
        let dest = self.cache_path(url);
        let written = single::download_to(url, &dest, hasher, &self.options, cancel)?;
        tracing::debug!(url, path = %dest.display(), bytes = written, "download complete");
        Ok(dest)
    }
}
