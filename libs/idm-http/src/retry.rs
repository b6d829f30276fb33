//! Generic retry loop driven by a caller-supplied policy.
//!
//! The executor makes an attempt, hands the outcome to the policy, and does
//! exactly what the returned [`Verdict`] says. It has no attempt limit or
//! backoff of its own. Because every evaluation must return a verdict, a
//! policy cannot leave the loop undecided.

use std::future::Future;
use std::time::Duration;

/// What to do after an attempt.
#[derive(Debug)]
pub enum Verdict<T, E> {
    /// Wait, then make another attempt.
    Retry(Duration),
    /// Finish with this value. `None` when the last attempt failed and the
    /// policy chose not to surface the error.
    Stop(Option<T>),
    /// Finish with this error.
    Fail(E),
}

/// Decides after every attempt whether to continue.
///
/// `attempt` starts at 1. The outcome is handed over by value so the policy
/// can return the success value or the original error.
pub trait RetryPolicy<T, E> {
    fn evaluate(&self, outcome: Result<T, E>, attempt: u32) -> Verdict<T, E>;
}

impl<T, E, F> RetryPolicy<T, E> for F
where
    F: Fn(Result<T, E>, u32) -> Verdict<T, E>,
{
    fn evaluate(&self, outcome: Result<T, E>, attempt: u32) -> Verdict<T, E> {
        self(outcome, attempt)
    }
}

pub struct RetryExecutor<P> {
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Runs `operation` until the policy stops or fails.
    ///
    /// Each attempt's outcome replaces the previous one; nothing carries over
    /// between attempts.
    ///
    /// # Errors
    ///
    /// Returns the error carried by [`Verdict::Fail`].
    pub async fn run<T, E, Op, Fut>(&self, mut operation: Op) -> Result<Option<T>, E>
    where
        P: RetryPolicy<T, E>,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 1;
        loop {
            let outcome = operation().await;
            match self.policy.evaluate(outcome, attempt) {
                Verdict::Retry(delay) => {
                    tracing::debug!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying operation"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt = attempt.saturating_add(1);
                }
                Verdict::Stop(value) => return Ok(value),
                Verdict::Fail(err) => return Err(err),
            }
        }
    }
}
