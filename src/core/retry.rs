use crate::core::classifier::ClassifiedError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry, filtered on [`ClassifiedError::is_retryable`].
///
/// `max_retries` counts additional attempts after the first one, so an
/// operation runs at most `max_retries + 1` times. On exhaustion the last
/// observed failure is returned as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// Bookkeeping for a single `execute` call.
#[derive(Debug, Default)]
struct RetryState {
    attempts_made: u32,
    last_failure: Option<ClassifiedError>,
}

impl RetryState {
    fn record(&mut self, failure: &ClassifiedError) {
        self.attempts_made += 1;
        self.last_failure = Some(failure.clone());
    }

    fn retries_so_far(&self) -> u32 {
        self.attempts_made.saturating_sub(1)
    }

    fn last_message(&self) -> &str {
        self.last_failure
            .as_ref()
            .map(|failure| failure.message.as_str())
            .unwrap_or_default()
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifiedError>>,
    {
        let mut state = RetryState::default();

        loop {
            let failure = match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };
            state.record(&failure);

            if !failure.is_retryable() {
                return Err(failure);
            }
            if state.retries_so_far() >= self.max_retries {
                if self.max_retries > 0 {
                    tracing::warn!(
                        "Retries exhausted after {} attempts: {}",
                        state.attempts_made,
                        state.last_message()
                    );
                }
                return Err(failure);
            }

            tracing::debug!(
                "Attempt {} failed ({}), retrying in {:?}",
                state.attempts_made,
                state.last_message(),
                self.delay
            );
            tokio::time::sleep(self.delay).await;
            tracing::info!("Number of retries: {}", state.attempts_made);
        }
    }
}
