use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;
use warta_core::config::RetryConfig;
use warta_core::Error;

/// Bounded re-execution of a fallible async operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { error: Error, attempts: u32 },
    Cancelled,
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => *attempts,
            RetryOutcome::Cancelled => 0,
        }
    }

    pub fn into_result(self) -> warta_core::Result<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { error, .. } => Err(error),
            RetryOutcome::Cancelled => Err(Error::Cancelled),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error or the
    /// attempts are used up. Nothing is attempted once `cancel` has fired.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = warta_core::Result<T>>,
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return RetryOutcome::Cancelled;
            }
            attempt += 1;

            let error = match op().await {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Err(Error::Cancelled) => return RetryOutcome::Cancelled,
                Err(_) if cancel.is_cancelled() => return RetryOutcome::Cancelled,
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.attempts {
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                };
            }

            warn!(
                attempt,
                max_attempts = self.attempts,
                delay_ms = self.delay.as_millis() as u64,
                error = %error,
                "🔁 Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_retry() {
        let calls = AtomicU32::new(0);
        let outcome = RetryPolicy::immediate(2)
            .run(&CancellationToken::new(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::status("https://www.detik.com/search", 502))
                } else {
                    Ok("listing")
                }
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Succeeded { value: "listing", attempts: 2 }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(3)
            .run(&CancellationToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Parse("blank listing".into()))
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted { error: Error::Parse(_), attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryPolicy::immediate(5)
            .run(&CancellationToken::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Config("bad selector".into()))
            })
            .await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let outcome: RetryOutcome<()> = RetryPolicy::immediate(2)
            .run(&cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_delay() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(60));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome: RetryOutcome<()> = policy
            .run(&cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::fetch("https://www.liputan6.com/search", "connection reset"))
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(outcome.into_result().is_err());
    }
}
