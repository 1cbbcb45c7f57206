/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use notewai::app_config::{Config, LogLevel, TranslationProvider};
use notewai::records::FieldMappingEntry;
use notewai::translation::PromptTemplate;

use crate::common;

/// Config with an explicit key so results do not depend on the environment
fn keyed_config() -> Config {
    let mut config = Config::default();
    config
        .translation
        .provider_config_mut(TranslationProvider::OpenAI)
        .api_key = "sk-config".to_string();
    config
}

#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "Japanese");
    assert_eq!(config.target_language, "English");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(
        config.fields,
        vec![
            FieldMappingEntry::new("Front", "Front"),
            FieldMappingEntry::new("Back", "Back")
        ]
    );

    let common = &config.translation.common;
    assert_eq!(common.prompt, PromptTemplate::DEFAULT);
    assert!(common.preserve_image_tags);
    assert_eq!(common.concurrent_requests, 4);
    assert_eq!(common.max_attempts, 3);
    assert_eq!(common.retry_backoff_ms, 1000);
    assert_eq!(common.max_total_backoff_ms, 30_000);
    assert_eq!(config.log_level, LogLevel::Info);

    let gemini = config
        .translation
        .get_provider_config(TranslationProvider::Gemini)
        .expect("Gemini provider config should exist");
    assert_eq!(gemini.model, "gemini-1.5-flash");
}

#[test]
fn test_resolve_withValidConfig_shouldProduceTranslationConfig() {
    let mut config = keyed_config();
    config.translation.common.concurrent_requests = 2;
    config.translation.common.retry_backoff_ms = 250;

    let resolved = config.resolve().unwrap();

    assert_eq!(resolved.provider, TranslationProvider::OpenAI);
    assert_eq!(resolved.model, "gpt-4o-mini");
    assert_eq!(resolved.source_language, "Japanese");
    assert_eq!(resolved.concurrency_limit, 2);
    assert_eq!(resolved.retry.max_attempts, 3);
    assert_eq!(resolved.retry.base_delay, Duration::from_millis(250));
    assert_eq!(resolved.retry.max_total_backoff, Duration::from_secs(30));
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = keyed_config();
    assert!(config.validate().is_ok());

    config.target_language = " ".to_string();
    assert!(config.validate().is_err());
    config.target_language = "English".to_string();

    config.translation.common.concurrent_requests = 0;
    assert!(config.validate().is_err());
    config.translation.common.concurrent_requests = 4;

    config.translation.common.prompt = "Translate {sentence}".to_string();
    assert!(config.validate().is_err());
    config.translation.common.prompt = PromptTemplate::DEFAULT.to_string();

    config.fields.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_getApiKey_withConfiguredKey_shouldOverrideEnvironment() {
    let config = keyed_config();
    assert_eq!(
        config.translation.get_api_key(TranslationProvider::OpenAI).as_deref(),
        Some("sk-config")
    );
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");

    let (config, created) = Config::load_or_create(&path).unwrap();
    assert!(created);
    assert!(path.exists());
    assert_eq!(config.target_language, "English");

    let (reloaded, created) = Config::load_or_create(&path).unwrap();
    assert!(!created);
    assert_eq!(reloaded.translation.common.max_attempts, 3);
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "target_language": "fr",
            "translation": { "provider": "gemini", "common": { "concurrent_requests": 1 } },
            "fields": [ { "source": "Front", "target": "Back" } ]
        }"#,
    )
    .unwrap();

    let (config, _) = Config::load_or_create(&path).unwrap();

    assert_eq!(config.source_language, "Japanese");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.translation.provider, TranslationProvider::Gemini);
    assert_eq!(config.translation.get_model(), "gemini-1.5-flash");
    assert_eq!(config.translation.common.concurrent_requests, 1);
    assert_eq!(config.translation.common.max_attempts, 3);
    assert_eq!(config.field_mapping().entries()[0], FieldMappingEntry::new("Front", "Back"));
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_or_create(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
