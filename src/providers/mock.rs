/*!
 * Mock provider implementations for testing.
 *
 * This module provides a scripted provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::failing(kind)` - Always fails with the given error kind
 * - `MockProvider::flaky(n, kind)` - Fails the first `n` calls for each text, then succeeds
 * - `MockProvider::slow(ms)` - Succeeds after a delay
 *
 * Texts can also be singled out with [`MockProvider::fail_on`], and every clone
 * shares the same counters so tests can inspect what the orchestrator did.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{ErrorKind, ProviderError};
use crate::providers::{Provider, ProviderRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with an error of this kind
    Failing(ErrorKind),
    /// Fails the first `failures` calls for each distinct text
    Flaky { failures: usize, kind: ErrorKind },
    /// Simulates slow response (for timing and cancellation tests)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Extra latency applied to every call
    delay: Option<Duration>,
    /// Texts containing the pattern fail with the paired error
    fail_rules: Vec<(String, ProviderError)>,
    /// Total calls across all clones
    request_count: Arc<AtomicUsize>,
    /// Calls currently executing
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` ever reached
    peak_in_flight: Arc<AtomicUsize>,
    /// Calls seen per text, used by the flaky mode
    calls_per_text: Arc<Mutex<HashMap<String, usize>>>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&ProviderRequest) -> String>,
}

/// Decrements the in-flight counter even when the call future is dropped
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            fail_rules: Vec::new(),
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            calls_per_text: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(MockBehavior::Failing(kind))
    }

    /// Create a mock that fails `failures` times per text before succeeding
    pub fn flaky(failures: usize, kind: ErrorKind) -> Self {
        Self::new(MockBehavior::Flaky { failures, kind })
    }

    /// Create a mock that answers after `delay_ms` milliseconds
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Add latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every request whose text contains `pattern`
    pub fn fail_on(mut self, pattern: impl Into<String>, error: ProviderError) -> Self {
        self.fail_rules.push((pattern.into(), error));
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&ProviderRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were executing at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Copy of every request received
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls received for one text
    pub fn calls_for(&self, text: &str) -> usize {
        self.calls_per_text.lock().get(text).copied().unwrap_or(0)
    }

    fn respond(&self, request: &ProviderRequest, call_for_text: usize) -> Result<String, ProviderError> {
        if let Some((_, error)) = self
            .fail_rules
            .iter()
            .find(|(pattern, _)| request.text.contains(pattern.as_str()))
        {
            return Err(error.clone());
        }

        match self.behavior {
            MockBehavior::Failing(kind) => {
                return Err(ProviderError::new(kind, "Simulated provider failure"));
            }
            MockBehavior::Flaky { failures, kind } if call_for_text <= failures => {
                return Err(ProviderError::new(
                    kind,
                    format!("Simulated failure {} of {}", call_for_text, failures),
                ));
            }
            _ => {}
        }

        Ok(match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}] {}", request.target_language, request.text),
        })
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            delay: self.delay,
            fail_rules: self.fail_rules.clone(),
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
            calls_per_text: Arc::clone(&self.calls_per_text),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let call_for_text = {
            let mut calls = self.calls_per_text.lock();
            let count = calls.entry(request.text.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.requests.lock().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let delay = match self.behavior {
            MockBehavior::Slow { delay_ms } => Some(Duration::from_millis(delay_ms)),
            _ => self.delay,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.respond(request, call_for_text)
    }
}
