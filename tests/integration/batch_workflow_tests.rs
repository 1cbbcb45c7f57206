/*!
 * End-to-end batch orchestration tests against the mock provider
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use notewai::app_config::TranslationProvider;
use notewai::errors::{BatchError, ErrorKind, ProviderError};
use notewai::providers::ProviderRegistry;
use notewai::providers::mock::MockProvider;
use notewai::records::{FieldMapping, Record};
use notewai::translation::{
    BatchOrchestrator, CancellationHandle, RecordResult, RecordState, SkipReason,
};

use crate::common::{self, card, front_back, mock_config, registry_with, sample_records};

#[tokio::test]
async fn test_run_withAuthErrorOnOneField_shouldSkipOnlyThatRecord() {
    common::init_logger();
    let provider = MockProvider::working().fail_on("いぬ", ProviderError::auth("Incorrect API key provided"));
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records = sample_records();

    let report = orchestrator.run(&records, &front_back(), &mock_config(4)).await.unwrap();

    assert_eq!(report.len(), 3);
    assert!(report.results[0].is_duplicated());
    assert!(report.results[2].is_duplicated());
    match &report.results[1] {
        RecordResult::Skipped(reasons) => {
            assert_eq!(reasons.len(), 1);
            assert!(matches!(
                &reasons[0],
                SkipReason::FieldFailed { field, kind: ErrorKind::AuthError, .. } if field == "Back"
            ));
        }
        other => panic!("expected record 2 to be skipped, got {:?}", other),
    }
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.retries, 0);
    // Front of the skipped record was still attempted
    assert_eq!(provider.calls_for("犬"), 1);
}

#[tokio::test]
async fn test_run_withSuccess_shouldCopyUnmappedFieldsAndLeaveSourceUntouched() {
    let provider = MockProvider::working();
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records = sample_records();
    let before = records.clone();

    let report = orchestrator.run(&records, &front_back(), &mock_config(2)).await.unwrap();

    assert_eq!(records, before);
    for (source, result) in records.iter().zip(&report.results) {
        let duplicate = result.duplicated().expect("every record should be duplicated");
        assert_eq!(duplicate.source_id, source.id);
        assert_ne!(duplicate.record.id, source.id);
        assert_eq!(duplicate.record.field("Notes"), source.field("Notes"));
        assert_eq!(
            duplicate.record.field("Front").map(str::to_string),
            source.field("Front").map(|t| format!("[en] {}", t))
        );
        assert_eq!(
            duplicate.record.field_names().collect::<Vec<_>>(),
            vec!["Front", "Back", "Notes"]
        );
    }
}

#[tokio::test]
async fn test_run_withConcurrencyOne_shouldSerializeRequests() {
    let provider = MockProvider::slow(10);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records: Vec<Record> = (1..=5)
        .map(|i| Record::new(i.to_string()).with_field("Front", format!("text {}", i)))
        .collect();
    let start = Instant::now();

    let report = orchestrator
        .run(&records, &FieldMapping::identity(["Front"]), &mock_config(1))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50), "took {:?}", start.elapsed());
    assert_eq!(report.stats.succeeded, 5);
    assert_eq!(provider.peak_in_flight(), 1);
}

#[tokio::test]
async fn test_run_withManyRecords_shouldRespectConcurrencyCapAndOrder() {
    let provider = MockProvider::slow(5);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records: Vec<Record> = (0..20)
        .map(|i| card(&i.to_string(), &format!("front {}", i), &format!("back {}", i)))
        .collect();

    let report = orchestrator.run(&records, &front_back(), &mock_config(3)).await.unwrap();

    assert_eq!(report.len(), records.len());
    assert!(provider.peak_in_flight() <= 3);
    assert_eq!(provider.request_count(), 40);
    for (i, result) in report.results.iter().enumerate() {
        let duplicate = result.duplicated().unwrap();
        assert_eq!(duplicate.source_id.as_str(), i.to_string());
        assert_eq!(duplicate.record.field("Back"), Some(format!("[en] back {}", i).as_str()));
    }
}

#[tokio::test]
async fn test_run_withAlwaysRateLimited_shouldFailAfterMaxAttempts() {
    let provider = MockProvider::failing(ErrorKind::RateLimited);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records = vec![Record::new("1").with_field("Front", "猫")];

    let report = orchestrator
        .run(&records, &FieldMapping::identity(["Front"]), &mock_config(1))
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 3);
    assert_eq!(report.stats.retries, 2);
    assert!(matches!(
        report.results[0].skip_reasons(),
        [SkipReason::FieldFailed { kind: ErrorKind::RateLimited, .. }]
    ));
}

#[tokio::test]
async fn test_run_withTransientFailures_shouldRecoverAndCountRetries() {
    let provider = MockProvider::flaky(1, ErrorKind::TransientNetworkError);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records = sample_records();

    let report = orchestrator.run(&records, &front_back(), &mock_config(4)).await.unwrap();

    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.retries, 6);
    assert_eq!(provider.request_count(), 12);
}

#[tokio::test]
async fn test_runWithCancel_midBatch_shouldSkipUnresolvedRecords() {
    let provider = MockProvider::slow(30);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records: Vec<Record> = (0..10)
        .map(|i| Record::new(i.to_string()).with_field("Front", format!("text {}", i)))
        .collect();
    let cancel = CancellationHandle::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(45)).await;
        trigger.cancel();
    });
    let start = Instant::now();
    let report = orchestrator
        .run_with_cancel(&records, &FieldMapping::identity(["Front"]), &mock_config(1), &cancel)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_millis(250), "took {:?}", start.elapsed());
    assert_eq!(report.len(), 10);
    assert!(report.stats.skipped >= 8);
    for result in &report.results {
        assert!(result.is_duplicated() || result.skip_reasons() == [SkipReason::Cancelled]);
    }
}

#[tokio::test]
async fn test_run_withUnregisteredProvider_shouldFailBeforeAnyRequest() {
    let provider = MockProvider::working();
    let registry = ProviderRegistry::new().with(TranslationProvider::Gemini, Arc::new(provider.clone()));
    let orchestrator = BatchOrchestrator::new(registry);

    let err = orchestrator
        .run(&sample_records(), &front_back(), &mock_config(2))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::ConfigInvalid(_)));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_run_withZeroConcurrency_shouldBeConfigInvalid() {
    let provider = MockProvider::working();
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));

    let result = orchestrator
        .run(&sample_records(), &front_back(), &mock_config(0))
        .await;

    assert!(matches!(result, Err(BatchError::ConfigInvalid(_))));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_run_withEmptyAndMissingFields_shouldSkipWithReason() {
    let provider = MockProvider::working();
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));
    let records = vec![
        card("1", "", " "),
        Record::new("2").with_field("Front", "猫"),
        card("3", "鳥", ""),
    ];

    let report = orchestrator.run(&records, &front_back(), &mock_config(2)).await.unwrap();

    assert_eq!(report.results[0].skip_reasons(), [SkipReason::NothingToTranslate]);
    assert_eq!(report.results[1].skip_reasons(), [SkipReason::MissingField("Back".to_string())]);
    let duplicate = report.results[2].duplicated().unwrap();
    assert_eq!(duplicate.record.field("Front"), Some("[en] 鳥"));
    assert_eq!(duplicate.record.field("Back"), Some(""));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_run_withEmptyBatch_shouldReturnEmptyReport() {
    let provider = MockProvider::working();
    let orchestrator = BatchOrchestrator::new(registry_with(&provider));

    let report = orchestrator.run(&[], &front_back(), &mock_config(2)).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.stats.succeeded, 0);
}

#[tokio::test]
async fn test_withProgress_shouldReportEveryRecordReachingTerminalState() {
    let provider = MockProvider::working().fail_on("とり", ProviderError::malformed("empty candidate"));
    let events: Arc<Mutex<Vec<(usize, RecordState)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let orchestrator = BatchOrchestrator::new(registry_with(&provider))
        .with_progress(move |index, state| sink.lock().push((index, state)));

    orchestrator.run(&sample_records(), &front_back(), &mock_config(2)).await.unwrap();

    let events = events.lock();
    for index in 0..3 {
        let states: Vec<RecordState> = events
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(states.first(), Some(&RecordState::Pending));
        assert_eq!(states.get(1), Some(&RecordState::InFlight));
        assert_eq!(states.len(), 3);
        assert!(states[2].is_terminal());
    }
    assert!(events.contains(&(2, RecordState::Skipped)));
}
