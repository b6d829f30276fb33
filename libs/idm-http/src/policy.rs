use std::time::Duration;

use crate::error::HttpError;
use crate::response::RetryAfterHint;
use crate::retry::{RetryPolicy, Verdict};

pub const DEFAULT_UPSTREAM_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_MULTIPLIER_SECS: u64 = 3;

/// Honours `Retry-After` from the CRM and identity backends.
///
/// - success without `Retry-After`: stop
/// - otherwise, before the attempt ceiling: wait `Retry-After` seconds, or
///   `attempt * delay_multiplier` when the header is absent or unparseable
/// - at the ceiling: fail with the original error, or
///   [`HttpError::RetryExhausted`] when the last attempt itself succeeded
///
/// Only error presence and the header are inspected, never the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpstreamRetryPolicy {
    delay_multiplier: Duration,
    max_attempts: u32,
}

impl Default for UpstreamRetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_DELAY_MULTIPLIER_SECS))
    }
}

impl UpstreamRetryPolicy {
    #[must_use]
    pub fn new(delay_multiplier: Duration) -> Self {
        Self {
            delay_multiplier,
            max_attempts: DEFAULT_UPSTREAM_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl<R: RetryAfterHint> RetryPolicy<R, HttpError> for UpstreamRetryPolicy {
    fn evaluate(&self, outcome: Result<R, HttpError>, attempt: u32) -> Verdict<R, HttpError> {
        let (asked_to_retry, hinted) = match &outcome {
            Ok(response) => (response.has_retry_after(), response.retry_after()),
            Err(_) => (false, None),
        };

        if outcome.is_ok() && !asked_to_retry {
            return Verdict::Stop(outcome.ok());
        }

        if attempt < self.max_attempts {
            return Verdict::Retry(hinted.unwrap_or(self.delay_multiplier * attempt));
        }

        match outcome {
            Err(err) => Verdict::Fail(err),
            Ok(_) => Verdict::Fail(HttpError::RetryExhausted { attempts: attempt }),
        }
    }
}

/// Retries connection failures and timeouts with doubling backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportRetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl TransportRetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(200),
        }
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

impl<R> RetryPolicy<R, HttpError> for TransportRetryPolicy {
    fn evaluate(&self, outcome: Result<R, HttpError>, attempt: u32) -> Verdict<R, HttpError> {
        match outcome {
            Ok(response) => Verdict::Stop(Some(response)),
            Err(err) if err.is_transient() && attempt <= self.max_retries => {
                tracing::warn!(error = %err, attempt, "transient upstream failure");
                Verdict::Retry(self.backoff(attempt))
            }
            Err(err) => Verdict::Fail(err),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Hint(Option<&'static str>);

    impl RetryAfterHint for Hint {
        fn has_retry_after(&self) -> bool {
            self.0.is_some()
        }

        fn retry_after(&self) -> Option<Duration> {
            self.0.and_then(|v| v.parse().ok()).map(Duration::from_secs)
        }
    }

    fn policy() -> UpstreamRetryPolicy {
        UpstreamRetryPolicy::new(Duration::from_secs(3))
    }

    fn err() -> HttpError {
        HttpError::Transport("socket hang up".into())
    }

    #[test]
    fn test_success_without_header_stops() {
        match policy().evaluate(Ok(Hint(None)), 1) {
            Verdict::Stop(Some(Hint(None))) => {}
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_retry_after_header_sets_delay() {
        for attempt in [1, 2] {
            match policy().evaluate(Ok(Hint(Some("123"))), attempt) {
                Verdict::Retry(delay) => assert_eq!(delay.as_millis(), 123_000),
                other => panic!("unexpected verdict at {attempt}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_retry_after_at_ceiling_fails() {
        match policy().evaluate(Ok(Hint(Some("123"))), 3) {
            Verdict::Fail(err) => {
                assert!(matches!(err, HttpError::RetryExhausted { attempts: 3 }));
                assert!(
                    err.to_string()
                        .contains("Retry-After header found but retry limit hit")
                );
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_error_backs_off_by_multiplier() {
        for attempt in [1_u32, 2] {
            match RetryPolicy::<Hint, _>::evaluate(&policy(), Err(err()), attempt) {
                Verdict::Retry(delay) => {
                    assert_eq!(delay.as_millis(), u128::from(attempt) * 3 * 1000);
                }
                other => panic!("unexpected verdict at {attempt}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_error_at_ceiling_is_rethrown() {
        match RetryPolicy::<Hint, _>::evaluate(&policy(), Err(err()), 3) {
            Verdict::Fail(e) => assert_eq!(e.to_string(), "Transport error: socket hang up"),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_header_falls_back_to_multiplier() {
        match policy().evaluate(Ok(Hint(Some("later"))), 2) {
            Verdict::Retry(delay) => assert_eq!(delay, Duration::from_secs(6)),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_transport_policy_retries_only_transient_errors() {
        let policy = TransportRetryPolicy::new(2).with_base_delay(Duration::from_millis(100));

        match RetryPolicy::<(), _>::evaluate(&policy, Err(err()), 1) {
            Verdict::Retry(d) => assert_eq!(d, Duration::from_millis(100)),
            other => panic!("unexpected verdict: {other:?}"),
        }
        match RetryPolicy::<(), _>::evaluate(&policy, Err(err()), 2) {
            Verdict::Retry(d) => assert_eq!(d, Duration::from_millis(200)),
            other => panic!("unexpected verdict: {other:?}"),
        }
        assert!(matches!(
            RetryPolicy::<(), _>::evaluate(&policy, Err(err()), 3),
            Verdict::Fail(_)
        ));
        assert!(matches!(
            RetryPolicy::<(), _>::evaluate(
                &policy,
                Err(HttpError::RetryExhausted { attempts: 1 }),
                1
            ),
            Verdict::Fail(_)
        ));
    }
}
