//! Single-stream HTTP GET into a file, hashing inline.
//!
//! The body goes to `<dest>.part` and is renamed to `dest` only after a
//! successful 2xx transfer, so a failed or cancelled download never leaves a
//! file at the final path.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::TransferOptions;
use crate::checksum::StreamHasher;
use crate::control::CancelToken;
use crate::retry::TransferError;

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads `url` with a single GET, writing sequentially to `dest`.
/// Returns the number of bytes written.
pub(super) fn download_to(
    url: &str,
    dest: &Path,
    mut hasher: Option<&mut StreamHasher>,
    opts: &TransferOptions,
    cancel: &CancelToken,
) -> Result<u64, TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Aborted);
    }

    let part = part_path(dest);
    let mut file = File::create(&part)?;
    let mut written = 0u64;
    let mut write_error: Option<io::Error> = None;

    let outcome = perform_get(url, opts, cancel, |data| {
        if let Err(e) = file.write_all(data) {
            write_error = Some(e);
            return false;
        }
        if let Some(h) = hasher.as_deref_mut() {
            h.update(data);
        }
        written += data.len() as u64;
        true
    });

    let failure = match outcome {
        Ok(code) if (200..300).contains(&code) => None,
        Ok(code) => Some(TransferError::Http(code)),
        Err(_) if cancel.is_cancelled() => Some(TransferError::Aborted),
        Err(e) => match write_error.take() {
            Some(io_err) if e.is_write_error() => Some(TransferError::Io(io_err)),
            _ => Some(TransferError::Curl(e)),
        },
    };
    if let Some(err) = failure {
        drop(file);
        let _ = fs::remove_file(&part);
        return Err(err);
    }

    file.sync_all()?;
    drop(file);
    fs::rename(&part, dest)?;
    Ok(written)
}

/// Runs the GET, handing each body chunk to `sink`. `sink` returning false
/// aborts the transfer. Returns the final response code.
fn perform_get<F>(
    url: &str,
    opts: &TransferOptions,
    cancel: &CancelToken,
    mut sink: F,
) -> Result<u32, curl::Error>
where
    F: FnMut(&[u8]) -> bool,
{
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    opts.apply(&mut easy)?;
    easy.progress(true)?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if cancel.is_cancelled() || !sink(data) {
                return Ok(0); // short write aborts the transfer
            }
            Ok(data.len())
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()?;
    }
    easy.response_code()
}
