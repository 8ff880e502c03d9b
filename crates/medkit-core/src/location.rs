//! Artifact URL and filename derivation.
//!
//! Pure string composition: identical inputs always give the same
//! `ResolvedLocation`, and nothing here touches the network or disk.

use crate::error::SourceError;

/// Release name denoting the continuously rebuilt snapshot.
pub const ROLLING_RELEASE: &str = "hbs";

/// Name of the checksum manifest next to the artifacts.
pub const MANIFEST_NAME: &str = "sha256sums";

const ARTIFACT_SUFFIX: &str = "medkit-latest.tar.gz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub architecture_path: String,
    /// Directory URL of the artifact, always ending in a single `/`.
    pub base_artifact_url: String,
    pub filename: String,
}

impl ResolvedLocation {
    pub fn artifact_url(&self) -> String {
        format!("{}{}", self.base_artifact_url, self.filename)
    }

    pub fn manifest_url(&self) -> String {
        format!("{}{}", self.base_artifact_url, MANIFEST_NAME)
    }
}

/// True for the rolling snapshot release (case-insensitive).
pub fn is_rolling(release: &str) -> bool {
    release.eq_ignore_ascii_case(ROLLING_RELEASE)
}

/// Builds the artifact location for `release` on `architecture_path` under `base_url`.
///
/// Rolling snapshots live under `<base>/<arch>/medkit/` with an unprefixed
/// filename; every other release prefixes the filename with its lowercased name.
pub fn build_location(
    release: &str,
    architecture_path: &str,
    base_url: &str,
) -> Result<ResolvedLocation, SourceError> {
    if architecture_path.is_empty() {
        return Err(SourceError::UnsupportedArchitecture {
            architecture: architecture_path.to_string(),
        });
    }

    let base = base_url.trim_end_matches('/');
    let release_prefix = if is_rolling(release) {
        String::new()
    } else {
        format!("{}-", release.to_lowercase())
    };

    Ok(ResolvedLocation {
        architecture_path: architecture_path.to_string(),
        base_artifact_url: format!("{}/{}/medkit/", base, architecture_path),
        filename: format!(
            "{}{}-{}",
            release_prefix,
            architecture_path.replace('/', "-"),
            ARTIFACT_SUFFIX
        ),
    })
}
