//! Error taxonomy for the medkit source pipeline.
//!
//! Every fatal failure carries the URL or path involved so a failed run can
//! be diagnosed from the log line alone.

use std::path::PathBuf;

use crate::extract::ExtractionError;
use crate::manifest::ManifestError;
use crate::retry::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The configured architecture has no vendor path mapping.
    #[error("unsupported architecture {architecture:?}")]
    UnsupportedArchitecture { architecture: String },

    /// A URL could not be parsed.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No trusted keys and no verification skip, but the source is not HTTPS.
    #[error("refusing to download from {url}: trusted keys are required when not using https")]
    InsecureSourceRejected { url: String },

    /// The reachability probe gave up and the probe policy is fatal.
    #[error("source {url} unreachable after {attempts} attempt(s): {cause}")]
    Unreachable {
        url: String,
        attempts: u32,
        cause: TransferError,
    },

    /// Transport or local I/O failure while retrieving a manifest or artifact.
    #[error("failed to download {url}")]
    DownloadFailed {
        url: String,
        #[source]
        source: TransferError,
    },

    /// The checksum manifest could not be read or parsed.
    #[error("invalid checksum manifest {url}")]
    ManifestInvalid {
        url: String,
        #[source]
        source: ManifestError,
    },

    /// The checksum manifest has no line for the artifact.
    #[error("no checksum for {filename} in {manifest_url}")]
    ManifestEntryMissing {
        manifest_url: String,
        filename: String,
    },

    /// The streamed digest disagrees with the manifest.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Decoding or writing the archive failed.
    #[error("failed to unpack {} into {}", archive.display(), dest.display())]
    ExtractionFailed {
        archive: PathBuf,
        dest: PathBuf,
        #[source]
        source: ExtractionError,
    },

    /// The run was cancelled through its `CancelToken`.
    #[error("operation cancelled")]
    Cancelled,
}

impl SourceError {
    /// Wraps a transfer error for `url`, keeping cancellation distinct from failure.
    pub(crate) fn from_transfer(url: &str, err: TransferError) -> Self {
        if err.is_aborted() {
            SourceError::Cancelled
        } else {
            SourceError::DownloadFailed {
                url: url.to_string(),
                source: err,
            }
        }
    }
}
