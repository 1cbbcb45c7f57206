/*!
 * Tests for the shared retry controller
 */

use std::time::{Duration, Instant};

use futures::future::join_all;
use notewai::errors::{ErrorKind, ProviderError};
use notewai::providers::ProviderRequest;
use notewai::providers::mock::MockProvider;
use notewai::translation::{CancellationHandle, PromptTemplate, RetryController, RetryPolicy};

use crate::common;

fn request(text: &str) -> ProviderRequest {
    ProviderRequest {
        text: text.to_string(),
        source_language: "ja".to_string(),
        target_language: "en".to_string(),
        model: "mock-model".to_string(),
        template: PromptTemplate::default(),
        preserve_image_tags: false,
        temperature: 0.2,
    }
}

#[tokio::test]
async fn test_execute_withManyCallers_shouldNeverExceedConcurrencyLimit() {
    let provider = MockProvider::slow(15);
    let controller = RetryController::new(3, common::fast_retry(3), CancellationHandle::new());

    let texts: Vec<String> = (0..12).map(|i| format!("text {}", i)).collect();
    let requests: Vec<ProviderRequest> = texts.iter().map(|t| request(t)).collect();
    let results = join_all(requests.iter().map(|r| controller.execute(&provider, r))).await;

    assert!(results.iter().all(|a| a.result.is_ok()));
    assert_eq!(provider.request_count(), 12);
    assert!(provider.peak_in_flight() <= 3, "peak was {}", provider.peak_in_flight());
    assert_eq!(controller.available_permits(), 3);
}

#[tokio::test]
async fn test_execute_withBackoff_shouldReleasePermitForOtherRequests() {
    let provider = MockProvider::working().fail_on("always", ProviderError::rate_limited("busy", None));
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
        max_total_backoff: Duration::from_secs(5),
    };
    let controller = RetryController::new(1, policy, CancellationHandle::new());
    let start = Instant::now();

    let failing_request = request("always busy");
    let ok_request = request("fine");
    let failing = controller.execute(&provider, &failing_request);
    let succeeding = async {
        // Let the failing request take the only permit first
        tokio::time::sleep(Duration::from_millis(10)).await;
        let attempted = controller.execute(&provider, &ok_request).await;
        (attempted, start.elapsed())
    };
    let (failed, (succeeded, succeeded_at)) = tokio::join!(failing, succeeding);

    assert_eq!(failed.attempts, 3);
    assert_eq!(failed.result.unwrap_err().kind, ErrorKind::RateLimited);
    assert_eq!(succeeded.result.unwrap(), "[en] fine");
    assert!(
        succeeded_at < Duration::from_millis(250),
        "second request waited for the backoff: {:?}",
        succeeded_at
    );
}

#[tokio::test]
async fn test_execute_withRetryAfterHint_shouldWaitAtLeastTheHint() {
    let provider = MockProvider::flaky(1, ErrorKind::TransientNetworkError);
    let controller = RetryController::new(1, common::fast_retry(2), CancellationHandle::new());
    let start = Instant::now();
    let attempted = controller.execute(&provider, &request("x")).await;
    assert!(attempted.result.is_ok());
    assert!(start.elapsed() < Duration::from_millis(500));

    let hinted = MockProvider::working().fail_on(
        "y",
        ProviderError::rate_limited("slow down", Some(Duration::from_millis(120))),
    );
    let controller = RetryController::new(1, common::fast_retry(2), CancellationHandle::new());
    let start = Instant::now();
    let attempted = controller.execute(&hinted, &request("y")).await;

    assert_eq!(attempted.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(120));
    assert_eq!(controller.retries(), 1);
}

#[tokio::test]
async fn test_execute_withUnknownError_shouldNotRetry() {
    let provider = MockProvider::failing(ErrorKind::Unknown);
    let controller = RetryController::new(1, common::fast_retry(5), CancellationHandle::new());

    let attempted = controller.execute(&provider, &request("x")).await;

    assert_eq!(attempted.attempts, 1);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_execute_whenAlreadyCancelled_shouldNotCallProvider() {
    let provider = MockProvider::working();
    let cancel = CancellationHandle::new();
    cancel.cancel();
    let controller = RetryController::new(1, common::fast_retry(3), cancel);

    let attempted = controller.execute(&provider, &request("x")).await;

    assert_eq!(attempted.result.unwrap_err().kind, ErrorKind::Cancelled);
    assert_eq!(attempted.attempts, 0);
    assert_eq!(provider.request_count(), 0);
}
