//! Retry loop: run a closure until success or policy says stop.

use std::fmt;

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// The last error seen once the policy stops retrying.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Number of attempts made, including the first.
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last_error)
    }
}

/// Runs `f` until it succeeds or `policy` refuses another attempt.
///
/// `f` receives the 1-based attempt number. `kind_of` classifies each error;
/// only retryable kinds lead to another attempt. Sleeps for the backoff
/// duration between attempts when it is non-zero.
pub fn retry_with<T, E, F, K>(policy: &RetryPolicy, kind_of: K, mut f: F) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    K: Fn(&E) -> ErrorKind,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, kind_of(&e)) {
                RetryDecision::NoRetry => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                RetryDecision::RetryAfter(d) => {
                    if !d.is_zero() {
                        std::thread::sleep(d);
                    }
                    attempt += 1;
                }
            },
        }
    }
}
