//! Verification policy: which integrity guarantee a download must carry.
//!
//! Precedence is explicit skip, then keyed manifest verification, then
//! transport-only trust. Transport-only trust is never granted over plain HTTP.

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::location::ResolvedLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumSource {
    /// Verification skipped by configuration.
    None,
    /// Digest listed in a sibling manifest under the artifact base URL.
    RemoteManifest { url: String },
    /// HTTPS transport integrity stands in for a manifest.
    SignatureRequired,
}

impl ChecksumSource {
    pub fn label(&self) -> &'static str {
        match self {
            ChecksumSource::None => "none",
            ChecksumSource::RemoteManifest { .. } => "remote-manifest",
            ChecksumSource::SignatureRequired => "signature-required",
        }
    }
}

/// Decide the checksum source for `location`. Fails before any artifact byte
/// is fetched when the configuration demands trust the source cannot give.
pub fn decide(
    config: &SourceConfig,
    location: &ResolvedLocation,
) -> Result<ChecksumSource, SourceError> {
    if config.skip_verification {
        return Ok(ChecksumSource::None);
    }
    if !config.trusted_keys.is_empty() {
        return Ok(ChecksumSource::RemoteManifest {
            url: location.manifest_url(),
        });
    }

    let parsed = url::Url::parse(&location.base_artifact_url).map_err(|e| {
        SourceError::InvalidUrl {
            url: location.base_artifact_url.clone(),
            reason: e.to_string(),
        }
    })?;
    if parsed.scheme() != "https" {
        return Err(SourceError::InsecureSourceRejected {
            url: location.base_artifact_url.clone(),
        });
    }
    Ok(ChecksumSource::SignatureRequired)
}
