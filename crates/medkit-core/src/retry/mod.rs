//! Bounded retry for transport operations.
//!
//! Errors are classified into coarse kinds (timeouts, throttling, connection
//! failures) and the policy decides whether another attempt is made. The
//! combinator always hands back the last error once attempts run out.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{retry_with, Exhausted};
