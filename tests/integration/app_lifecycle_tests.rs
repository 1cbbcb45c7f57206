/*!
 * Tests for the full application lifecycle from records file to output file
 */

use anyhow::Result;

use notewai::app_config::{Config, TranslationProvider};
use notewai::app_controller::{Controller, OutputEntry, OutputFile};
use notewai::errors::ProviderError;
use notewai::providers::mock::MockProvider;
use notewai::records::FieldMappingEntry;

use crate::common;

fn test_config() -> Config {
    let mut config = Config::default();
    config
        .translation
        .provider_config_mut(TranslationProvider::OpenAI)
        .api_key = "sk-test".to_string();
    config.translation.common.retry_backoff_ms = 1;
    config.translation.common.max_total_backoff_ms = 100;
    config
}

fn read_output(path: &std::path::Path) -> Result<OutputFile> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

#[tokio::test]
async fn test_run_withDefaultOutputPath_shouldWriteTranslatedNotes() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "deck.json", &common::sample_records())?;
    let provider = MockProvider::working();
    let controller = Controller::with_config(test_config())?;

    let report = controller
        .run_with_registry(common::registry_with(&provider), &input, None)
        .await?;

    assert_eq!(report.stats.succeeded, 3);
    let output_path = temp_dir.path().join("deck.en.json");
    assert!(output_path.exists());

    let output = read_output(&output_path)?;
    assert_eq!(output.provider, "openai");
    assert_eq!(output.model, "gpt-4o-mini");
    assert_eq!(output.target_language, "English");
    assert_eq!(output.stats, report.stats);
    assert_eq!(output.records.len(), 3);
    match &output.records[0] {
        OutputEntry::Duplicated { source_id, record } => {
            assert_eq!(source_id.as_str(), "1");
            assert_eq!(record.field("Front"), Some("[English] 猫"));
            assert_eq!(record.field("Back"), Some("[English] ねこ"));
            assert_eq!(record.field("Notes"), Some("note 1"));
        }
        other => panic!("expected a duplicated note, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingField_shouldRecordSkipReasonInOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "deck.json", &common::sample_records())?;
    let output_path = temp_dir.path().join("out.json");
    let provider = MockProvider::working().fail_on("いぬ", ProviderError::auth("Incorrect API key provided"));
    let controller = Controller::with_config(test_config())?;

    controller
        .run_with_registry(common::registry_with(&provider), &input, Some(output_path.clone()))
        .await?;

    let output = read_output(&output_path)?;
    assert_eq!(output.stats.skipped, 1);
    match &output.records[1] {
        OutputEntry::Skipped { source_id, reasons } => {
            assert_eq!(source_id.as_str(), "2");
            assert_eq!(reasons.len(), 1);
            assert!(reasons[0].starts_with("Back: AuthError"), "reason was {}", reasons[0]);
        }
        other => panic!("expected a skipped note, got {:?}", other),
    }
    assert!(!temp_dir.path().join("deck.en.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withCustomFieldMapping_shouldTranslateIntoTargetField() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "deck.json", &common::sample_records())?;
    let mut config = test_config();
    config.fields = vec![FieldMappingEntry::new("Front", "Notes")];
    let provider = MockProvider::working();
    let controller = Controller::with_config(config)?;

    let report = controller
        .run_with_registry(common::registry_with(&provider), &input, None)
        .await?;

    let duplicate = report.results[2].duplicated().expect("note should be duplicated");
    assert_eq!(duplicate.record.field("Front"), Some("鳥"));
    assert_eq!(duplicate.record.field("Notes"), Some("[English] 鳥"));
    assert_eq!(provider.request_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingInput_shouldFailWithoutRequests() {
    let temp_dir = common::create_temp_dir().unwrap();
    let provider = MockProvider::working();
    let controller = Controller::with_config(test_config()).unwrap();

    let result = controller
        .run_with_registry(
            common::registry_with(&provider),
            &temp_dir.path().join("missing.json"),
            None,
        )
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Failed to read records file"));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_run_withInvalidConfig_shouldFailBeforeWritingOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_records_file(temp_dir.path(), "deck.json", &common::sample_records())?;
    let mut config = test_config();
    config.translation.common.concurrent_requests = 0;
    let provider = MockProvider::working();
    let controller = Controller::with_config(config)?;

    let result = controller
        .run_with_registry(common::registry_with(&provider), &input, None)
        .await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 0);
    assert!(!temp_dir.path().join("deck.en.json").exists());
    Ok(())
}

#[test]
fn test_readRecords_withMalformedJson_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("deck.json");
    std::fs::write(&path, "[{\"id\": 1").unwrap();

    let err = Controller::read_records(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse records file"));
}
