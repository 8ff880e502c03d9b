//! Reachability probe: bounded HEAD retries with a typed outcome.
//!
//! The prober never decides whether an unreachable source is fatal; it
//! reports what happened and the pipeline applies its `ProbePolicy`.

use crate::control::CancelToken;
use crate::downloader::Downloader;
use crate::error::SourceError;
use crate::fetch_head::HeadResult;
use crate::retry::{classify, retry_with, RetryPolicy, TransferError};

#[derive(Debug)]
pub enum ProbeOutcome {
    Reachable(HeadResult),
    Unreachable { attempts: u32, cause: TransferError },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable(_))
    }
}

/// HEAD `url` up to `policy.max_attempts` times.
///
/// Only cancellation is an error here; every transport failure ends up in
/// `ProbeOutcome::Unreachable` with the last cause.
pub fn probe(
    downloader: &dyn Downloader,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<ProbeOutcome, SourceError> {
    let result = retry_with(policy, classify, |attempt| {
        if cancel.is_cancelled() {
            return Err(TransferError::Aborted);
        }
        downloader.head(url, cancel).map_err(|e| {
            tracing::debug!(url, attempt, error = %e, "HEAD attempt failed");
            e
        })
    });

    match result {
        Ok(head) => Ok(ProbeOutcome::Reachable(head)),
        Err(exhausted) if exhausted.last_error.is_aborted() => Err(SourceError::Cancelled),
        Err(exhausted) => Ok(ProbeOutcome::Unreachable {
            attempts: exhausted.attempts,
            cause: exhausted.last_error,
        }),
    }
}
