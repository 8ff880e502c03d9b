//! `medkit checksum`: digest of a local file.

use anyhow::Result;
use medkit_core::checksum::{self, HashAlgorithm};
use std::path::Path;

/// Print the digest in `sha256sum` format so it can be pasted into a manifest.
pub fn run_checksum(path: &Path, algorithm: HashAlgorithm) -> Result<()> {
    let digest = checksum::file_digest(path, algorithm)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
