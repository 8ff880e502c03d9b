//! Hashed artifact fetch.
//!
//! With a remote manifest the manifest is fetched first (unhashed; it is the
//! trust root), then the artifact is downloaded and hashed in one pass. A
//! digest mismatch removes the cached artifact so nothing downstream can pick
//! up an untrusted file.

use std::fs;
use std::path::PathBuf;

use crate::checksum::HashAlgorithm;
use crate::control::CancelToken;
use crate::downloader::Downloader;
use crate::error::SourceError;
use crate::location::ResolvedLocation;
use crate::manifest::{Manifest, ManifestError};
use crate::policy::ChecksumSource;
use crate::retry::TransferError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Cached artifact. The caller owns it until extraction completes.
    pub local_path: PathBuf,
    /// Lowercase hex digest, present only when it was checked against a manifest.
    pub verified_hash: Option<String>,
}

pub fn fetch(
    downloader: &dyn Downloader,
    location: &ResolvedLocation,
    checksum_source: &ChecksumSource,
    algorithm: HashAlgorithm,
    cancel: &CancelToken,
) -> Result<DownloadResult, SourceError> {
    let artifact_url = location.artifact_url();

    match checksum_source {
        ChecksumSource::RemoteManifest { url } => {
            let expected =
                expected_digest(downloader, url, &location.filename, algorithm, cancel)?;

            tracing::info!(url = %artifact_url, %algorithm, "downloading artifact");
            let mut hasher = algorithm.hasher();
            let local_path = downloader
                .download(&artifact_url, Some(&mut hasher), cancel)
                .map_err(|e| SourceError::from_transfer(&artifact_url, e))?;
            let actual = hasher.finalize_hex();

            if actual != expected {
                if let Err(e) = fs::remove_file(&local_path) {
                    tracing::warn!(path = %local_path.display(), error = %e, "could not remove rejected artifact");
                }
                return Err(SourceError::IntegrityMismatch {
                    filename: location.filename.clone(),
                    expected,
                    actual,
                });
            }

            tracing::info!(digest = %actual, "artifact checksum verified");
            Ok(DownloadResult {
                local_path,
                verified_hash: Some(actual),
            })
        }
        ChecksumSource::None | ChecksumSource::SignatureRequired => {
            tracing::info!(
                url = %artifact_url,
                verification = checksum_source.label(),
                "downloading artifact without digest check"
            );
            let local_path = downloader
                .download(&artifact_url, None, cancel)
                .map_err(|e| SourceError::from_transfer(&artifact_url, e))?;
            Ok(DownloadResult {
                local_path,
                verified_hash: None,
            })
        }
    }
}

/// Fetch the manifest at `manifest_url` and return the digest listed for `filename`.
///
/// The entry must have the hex length of `algorithm`, so a manifest of the
/// wrong kind fails here instead of after the artifact download.
fn expected_digest(
    downloader: &dyn Downloader,
    manifest_url: &str,
    filename: &str,
    algorithm: HashAlgorithm,
    cancel: &CancelToken,
) -> Result<String, SourceError> {
    tracing::info!(url = manifest_url, "downloading checksum manifest");
    let path = downloader
        .download(manifest_url, None, cancel)
        .map_err(|e| SourceError::from_transfer(manifest_url, e))?;
    let bytes = fs::read(&path).map_err(|e| SourceError::DownloadFailed {
        url: manifest_url.to_string(),
        source: TransferError::Io(e),
    })?;
    let manifest = Manifest::from_bytes(&bytes).map_err(|source| SourceError::ManifestInvalid {
        url: manifest_url.to_string(),
        source,
    })?;

    let digest = manifest
        .digest_for(filename)
        .ok_or_else(|| SourceError::ManifestEntryMissing {
            manifest_url: manifest_url.to_string(),
            filename: filename.to_string(),
        })?;
    if digest.len() != algorithm.hex_len() {
        return Err(SourceError::ManifestInvalid {
            url: manifest_url.to_string(),
            source: ManifestError::DigestLength {
                filename: filename.to_string(),
                algorithm: algorithm.to_string(),
                expected: algorithm.hex_len(),
                actual: digest.len(),
            },
        });
    }
    Ok(digest.to_string())
}
