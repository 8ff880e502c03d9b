//! HTTP HEAD probing.
//!
//! Uses the curl crate (libcurl) with `nobody` so no body is transferred.
//! Header metadata is kept for logging what the probe saw.

mod parse;

use std::str;

use crate::control::CancelToken;
use crate::downloader::TransferOptions;
use crate::retry::TransferError;

/// Metadata returned by a successful HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Final HTTP status (after redirects).
    pub status: u32,
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    /// Server advertised `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_disposition: Option<String>,
}

/// Performs a HEAD request against `url` and returns parsed metadata.
///
/// Follows redirects. Non-2xx final status is reported as `TransferError::Http`.
/// Runs in the current thread; the cancel token is polled from curl's progress callback.
pub fn head(
    url: &str,
    opts: &TransferOptions,
    cancel: &CancelToken,
) -> Result<HeadResult, TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Aborted);
    }

    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    opts.apply(&mut easy)?;
    easy.progress(true)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    let mut result = parse::parse_headers(&lines);
    result.status = code;
    Ok(result)
}
