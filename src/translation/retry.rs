/*!
 * Rate and retry control for provider calls.
 *
 * One controller is shared by every field of every record in a batch. It owns
 * the semaphore that caps in-flight requests and applies exponential backoff
 * to `RateLimited` and `TransientNetworkError` failures.
 *
 * A permit is held only while a request is on the wire. It is released before
 * any backoff sleep so that waiting retries never starve other requests.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest};
use crate::translation::cancel::CancellationHandle;
use crate::translation::model::RetryPolicy;

/// Final result of a retried call
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted {
    pub result: Result<String, ProviderError>,
    /// Provider calls made, first attempt included
    pub attempts: u32,
}

/// Concurrency cap plus retry policy, shared across a batch
#[derive(Debug)]
pub struct RetryController {
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    cancel: CancellationHandle,
    retries: AtomicUsize,
}

impl RetryController {
    pub fn new(concurrency_limit: usize, policy: RetryPolicy, cancel: CancellationHandle) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            policy,
            cancel,
            retries: AtomicUsize::new(0),
        }
    }

    /// Retries performed so far across all calls
    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call the provider until it succeeds, fails permanently or the budget runs out
    pub async fn execute(&self, provider: &dyn Provider, request: &ProviderRequest) -> Attempted {
        let mut attempts = 0u32;
        let mut waited = Duration::ZERO;

        loop {
            if self.cancel.is_cancelled() {
                return Attempted {
                    result: Err(ProviderError::cancelled()),
                    attempts,
                };
            }

            attempts += 1;
            let error = match self.attempt(provider, request).await {
                Ok(text) => {
                    return Attempted {
                        result: Ok(text),
                        attempts,
                    };
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Attempted {
                    result: Err(error),
                    attempts,
                };
            }

            if attempts >= self.policy.max_attempts {
                warn!(
                    "{} failed after {} attempts, giving up: {}",
                    provider.name(),
                    attempts,
                    error
                );
                return Attempted {
                    result: Err(error),
                    attempts,
                };
            }

            let mut delay = self.policy.backoff(attempts);
            if let Some(hint) = error.retry_after {
                delay = delay.max(hint);
            }
            if waited + delay > self.policy.max_total_backoff {
                warn!(
                    "{} retry budget of {:?} exhausted after {} attempts: {}",
                    provider.name(),
                    self.policy.max_total_backoff,
                    attempts,
                    error
                );
                return Attempted {
                    result: Err(error),
                    attempts,
                };
            }
            waited += delay;
            self.retries.fetch_add(1, Ordering::SeqCst);

            warn!(
                "{} request failed (attempt {}/{}), retrying in {} ms: {}",
                provider.name(),
                attempts,
                self.policy.max_attempts,
                delay.as_millis(),
                error
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Attempted {
                        result: Err(ProviderError::cancelled()),
                        attempts,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One request under a semaphore permit
    async fn attempt(
        &self,
        provider: &dyn Provider,
        request: &ProviderRequest,
    ) -> Result<String, ProviderError> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProviderError::cancelled()),
            permit = self.semaphore.acquire() => {
                permit.map_err(|_| ProviderError::cancelled())?
            }
        };
        debug!(
            "Sending {} request ({} permits left)",
            provider.name(),
            self.semaphore.available_permits()
        );

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::cancelled()),
            result = provider.translate(request) => result,
        }
    }
}
