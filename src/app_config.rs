use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use std::time::Duration;

use crate::records::{FieldMapping, FieldMappingEntry};
use crate::translation::model::{RetryPolicy, TranslationConfig};
use crate::translation::prompts::PromptTemplate;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings, and resolving API keys.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (ISO code or name)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language (ISO code or name)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Which note fields are translated and where the results go
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldMappingEntry>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI chat completions
    #[default]
    OpenAI,
    // @provider: Google Gemini generateContent
    Gemini,
}

impl TranslationProvider {
    /// Every supported provider
    pub const ALL: [TranslationProvider; 2] = [Self::OpenAI, Self::Gemini];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Gemini => "gemini".to_string(),
        }
    }

    // @returns: Environment variable holding the default API key
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key (falls back to the provider's environment variable)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            TranslationProvider::Gemini => Self {
                provider_type: "gemini".to_string(),
                model: default_gemini_model(),
                api_key: String::new(),
                endpoint: default_gemini_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Prompt template
    /// Placeholders: {text}, {source_language}, {target_language}
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Ask the model to keep `<img>` tags untouched
    #[serde(default = "default_true")]
    pub preserve_image_tags: bool,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of provider requests in flight across the whole batch
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Attempts per field, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound on the total backoff spent on one field, in milliseconds
    #[serde(default = "default_max_total_backoff_ms")]
    pub max_total_backoff_ms: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            preserve_image_tags: true,
            temperature: default_temperature(),
            concurrent_requests: default_concurrent_requests(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_total_backoff_ms: default_max_total_backoff_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "Japanese".to_string()
}

fn default_target_language() -> String {
    "English".to_string()
}

fn default_fields() -> Vec<FieldMappingEntry> {
    vec![
        FieldMappingEntry::new("Front", "Front"),
        FieldMappingEntry::new("Back", "Back"),
    ]
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_total_backoff_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_true() -> bool {
    true
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_prompt() -> String {
    PromptTemplate::DEFAULT.to_string()
}

fn default_available_providers() -> Vec<ProviderConfig> {
    TranslationProvider::ALL
        .iter()
        .map(|p| ProviderConfig::new(*p))
        .collect()
}

impl Config {
    /// Load a configuration file, writing a default one if it does not exist
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok((config, false))
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok((config, true))
        }
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Field mapping built from the `fields` section
    pub fn field_mapping(&self) -> FieldMapping {
        FieldMapping::new(self.fields.clone())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language must not be empty"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(anyhow!("At least one field mapping is required"));
        }
        if self.translation.common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.translation.common.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }
        PromptTemplate::parse(&self.translation.common.prompt).map_err(|e| anyhow!(e))?;

        let provider = self.translation.provider;
        if self.translation.get_api_key(provider).is_none() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set it in the config or {})",
                provider.display_name(),
                provider.api_key_env_var()
            ));
        }

        Ok(())
    }

    /// Resolve the settings into the configuration consumed by the orchestrator
    pub fn resolve(&self) -> Result<TranslationConfig> {
        self.validate()?;
        let common = &self.translation.common;

        Ok(TranslationConfig {
            provider: self.translation.provider,
            model: self.translation.get_model(),
            source_language: self.source_language.trim().to_string(),
            target_language: self.target_language.trim().to_string(),
            prompt_template: PromptTemplate::new(&common.prompt),
            preserve_image_tags: common.preserve_image_tags,
            temperature: common.temperature,
            concurrency_limit: common.concurrent_requests,
            retry: RetryPolicy {
                max_attempts: common.max_attempts,
                base_delay: Duration::from_millis(common.retry_backoff_ms),
                max_total_backoff: Duration::from_millis(common.max_total_backoff_ms),
            },
        })
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationSettings::default(),
            fields: default_fields(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationSettings {
    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get a mutable provider configuration, adding a default entry if missing
    pub fn provider_config_mut(&mut self, provider_type: TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider_type.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_provider_config(self.provider) {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Gemini => default_gemini_model(),
        }
    }

    /// Get the API key for a provider: the config value wins over the environment
    pub fn get_api_key(&self, provider: TranslationProvider) -> Option<String> {
        let from_env = std::env::var(provider.api_key_env_var()).ok();
        resolve_api_key(
            self.get_provider_config(provider).map(|p| p.api_key.as_str()),
            from_env.as_deref(),
        )
    }

    /// Get the endpoint for a provider
    pub fn get_endpoint(&self, provider: TranslationProvider) -> String {
        if let Some(provider_config) = self.get_provider_config(provider) {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Gemini => default_gemini_endpoint(),
        }
    }

    /// Get the request timeout for a provider
    pub fn get_timeout(&self, provider: TranslationProvider) -> Duration {
        let secs = self
            .get_provider_config(provider)
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs);
        Duration::from_secs(secs)
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: default_available_providers(),
            common: TranslationCommonConfig::default(),
        }
    }
}

/// Pick the API key: a non-empty configured value overrides the environment default
pub fn resolve_api_key(configured: Option<&str>, environment: Option<&str>) -> Option<String> {
    [configured, environment]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
}
