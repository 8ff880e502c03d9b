//! Transport error type shared by the probe and the downloader.

use std::fmt;

/// Error returned by a single HEAD or GET (curl failure, HTTP error, local I/O, or cancellation).
/// Kept separate from `SourceError` so retries can be classified before wrapping.
#[derive(Debug)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, TLS, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Writing the response body to the cache failed. Not retried.
    Io(std::io::Error),
    /// The transfer was stopped because cancellation was requested.
    Aborted,
}

impl TransferError {
    /// True when the error stems from a cancellation request rather than a failure.
    pub fn is_aborted(&self) -> bool {
        match self {
            TransferError::Aborted => true,
            TransferError::Curl(e) => e.is_aborted_by_callback(),
            TransferError::Http(_) | TransferError::Io(_) => false,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::Io(e) => write!(f, "io: {}", e),
            TransferError::Aborted => write!(f, "transfer aborted"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Io(e) => Some(e),
            TransferError::Http(_) | TransferError::Aborted => None,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        TransferError::Curl(e)
    }
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        TransferError::Io(e)
    }
}
