//! Unpacking the fetched medkit tarball into the rootfs directory.
//!
//! The pipeline talks to an `Extractor`; `TarExtractor` handles plain and
//! gzip-compressed tar. Ownership is not preserved and no leading path
//! components are stripped unless asked, so an unprivileged build gets the
//! archive's literal tree.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::SourceError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to escape the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal { path: String },

    #[error("archive contains no entries")]
    EmptyArchive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Leading path components dropped from every entry.
    pub strip_components: usize,
    /// Restore uid/gid from the archive (needs privileges).
    pub same_owner: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries written to the destination.
    pub entries: usize,
}

/// Archive decoder collaborator.
pub trait Extractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractReport, ExtractionError>;
}

/// Unpacks `archive` into `dest` with default options (no stripping, no
/// ownership), creating `dest` if needed.
pub fn extract_artifact(
    extractor: &dyn Extractor,
    archive: &Path,
    dest: &Path,
) -> Result<ExtractReport, SourceError> {
    let wrap = |source: ExtractionError| SourceError::ExtractionFailed {
        archive: archive.to_path_buf(),
        dest: dest.to_path_buf(),
        source,
    };

    tracing::info!(file = %archive.display(), dest = %dest.display(), "unpacking image");
    fs::create_dir_all(dest).map_err(|e| wrap(e.into()))?;
    let report = extractor
        .extract(archive, dest, &ExtractOptions::default())
        .map_err(wrap)?;
    tracing::debug!(entries = report.entries, "unpack complete");
    Ok(report)
}

/// `tar` + `flate2` extractor; compression is detected from the gzip magic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractReport, ExtractionError> {
        let mut reader = BufReader::new(File::open(archive)?);
        let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let reader: Box<dyn Read> = if gzipped {
            Box::new(flate2::read::GzDecoder::new(reader))
        } else {
            Box::new(reader)
        };

        let mut unpacker = tar::Archive::new(reader);
        unpacker.set_preserve_ownerships(options.same_owner);
        unpacker.set_preserve_permissions(true);
        unpacker.set_overwrite(true);

        let dest_canon = dest.canonicalize()?;
        let mut entries = 0;
        for entry in unpacker.entries()? {
            let mut entry = entry?;
            if unpack_entry(&mut entry, &dest_canon, options.strip_components)? {
                entries += 1;
            }
        }

        if entries == 0 {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(ExtractReport { entries })
    }
}

/// Unpack one entry. Returns false when stripping leaves nothing to write.
fn unpack_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    dest: &Path,
    strip: usize,
) -> Result<bool, ExtractionError> {
    let path = entry.path()?.into_owned();

    if strip == 0 {
        // unpack_in resolves hard links against `dest` and refuses to write
        // through symlinks that leave it.
        if entry.unpack_in(dest)? {
            return Ok(true);
        }
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    validate_entry_path(&path)?;
    let Some(rel) = strip_components(&path, strip) else {
        return Ok(false);
    };
    let target = dest.join(&rel);

    if entry.header().entry_type().is_hard_link() {
        let link = entry
            .link_name()?
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: path.display().to_string(),
            })?
            .into_owned();
        validate_entry_path(&link)?;
        let link_rel = strip_components(&link, strip).ok_or_else(|| {
            ExtractionError::PathTraversal {
                path: link.display().to_string(),
            }
        })?;
        fs::hard_link(dest.join(link_rel), &target)?;
        return Ok(true);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
        if !parent.canonicalize()?.starts_with(dest) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    entry.unpack(&target)?;
    Ok(true)
}

/// Drop the first `n` normal components (ignoring `.`); None if nothing remains.
fn strip_components(path: &Path, n: usize) -> Option<PathBuf> {
    let rest: PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .skip(n)
        .collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Reject absolute entry paths and `..` components.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
