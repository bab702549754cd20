//! Bounded retry with a fixed delay
//!
//! Retrying is an explicit operation over an async action rather than a
//! wrapper baked into the fetch itself, so the attempt count and the final
//! error are visible to the caller.

use std::future::Future;
use std::time::Duration;

/// Outcome of a retried action
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The action succeeded on attempt number `attempts` (1-based)
    Success { value: T, attempts: u32 },

    /// Every attempt failed; `last_error` is the error from the final attempt
    RetryExhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::RetryExhausted { attempts, .. } => *attempts,
        }
    }

    /// Converts into a plain `Result`, dropping the attempt count
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::RetryExhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Runs `action` up to `max_attempts` times, sleeping `delay` between failures
///
/// `action` receives the 1-based attempt number. The first `Ok` ends the loop
/// and no further attempts are made. No sleep happens after the final attempt.
/// A `max_attempts` of zero is treated as one.
///
/// # Example
///
/// ```
/// use hostwatch::crawler::{retry, RetryOutcome};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let outcome = retry(3, Duration::ZERO, |attempt| async move {
///     if attempt < 2 { Err("not yet") } else { Ok(attempt) }
/// })
/// .await;
///
/// assert!(matches!(outcome, RetryOutcome::Success { value: 2, attempts: 2 }));
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(max_attempts: u32, delay: Duration, mut action: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match action(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(last_error) if attempt >= max_attempts => {
                return RetryOutcome::RetryExhausted {
                    attempts: attempt,
                    last_error,
                }
            }
            Err(_) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
