/*!
 * Data model shared by the translation components.
 *
 * - `TranslationConfig`: fully resolved settings for one batch run
 * - `TranslationRequest` / `TranslationOutcome`: one field's worth of work and its result
 * - `RecordResult` / `BatchReport`: what the orchestrator hands back to the caller
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_config::TranslationProvider;
use crate::errors::{BatchError, ErrorKind};
use crate::providers::{ProviderRegistry, ProviderRequest};
use crate::records::{Record, RecordId};
use crate::translation::prompts::PromptTemplate;

/// Backoff settings for retryable provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per field, first try included
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further retry
    pub base_delay: Duration,
    /// Upper bound on the summed backoff for one field
    pub max_total_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_total_backoff: Duration::from_millis(30_000),
        }
    }
}

/// Resolved translation settings for one batch run
///
/// API keys are not part of this type: they are baked into the provider
/// clients registered in the [`ProviderRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    pub provider: TranslationProvider,
    pub model: String,
    pub source_language: String,
    pub target_language: String,
    pub prompt_template: PromptTemplate,
    pub preserve_image_tags: bool,
    pub temperature: f32,
    /// Maximum provider requests in flight across the whole batch
    pub concurrency_limit: usize,
    pub retry: RetryPolicy,
}

impl TranslationConfig {
    /// Create a config with default prompt, concurrency and retry settings
    pub fn new(
        provider: TranslationProvider,
        model: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            prompt_template: PromptTemplate::default(),
            preserve_image_tags: true,
            temperature: 0.2,
            concurrency_limit: 4,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = template;
        self
    }

    pub fn with_preserve_image_tags(mut self, preserve: bool) -> Self {
        self.preserve_image_tags = preserve;
        self
    }

    /// Check the config against the registered providers
    pub fn validate(&self, registry: &ProviderRegistry) -> Result<(), BatchError> {
        if !registry.contains(self.provider) {
            return Err(BatchError::ConfigInvalid(format!(
                "provider '{}' is not registered",
                self.provider
            )));
        }
        if self.concurrency_limit == 0 {
            return Err(BatchError::ConfigInvalid(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(BatchError::ConfigInvalid(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(BatchError::ConfigInvalid("model name is empty".to_string()));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(BatchError::ConfigInvalid(
                "source and target languages are required".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(BatchError::ConfigInvalid(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        self.prompt_template
            .validate()
            .map_err(BatchError::ConfigInvalid)
    }
}

/// One field's worth of work
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub record_id: RecordId,
    pub source_field: String,
    pub target_field: String,
    pub text: String,
    pub config: Arc<TranslationConfig>,
}

impl TranslationRequest {
    /// Provider-neutral call description for this request
    pub fn to_provider_request(&self) -> ProviderRequest {
        ProviderRequest {
            text: self.text.clone(),
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
            model: self.config.model.clone(),
            template: self.config.prompt_template.clone(),
            preserve_image_tags: self.config.preserve_image_tags,
            temperature: self.config.temperature,
        }
    }
}

/// Terminal result of one translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranslationOutcome {
    Success(String),
    Failure { kind: ErrorKind, message: String },
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Outcome of one mapped field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOutcome {
    pub source_field: String,
    pub target_field: String,
    pub outcome: TranslationOutcome,
    /// Provider calls made, first attempt included
    pub attempts: u32,
}

/// Lifecycle of a record within one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    Pending,
    InFlight,
    Duplicated,
    Skipped,
}

impl RecordState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Duplicated | Self::Skipped)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InFlight => "in flight",
            Self::Duplicated => "duplicated",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Why a record was not duplicated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// A mapped field could not be translated
    FieldFailed {
        field: String,
        kind: ErrorKind,
        message: String,
    },
    /// The batch was cancelled before the record resolved
    Cancelled,
    /// Every mapped source field is empty
    NothingToTranslate,
    /// The record lacks a field named by the mapping
    MissingField(String),
    /// Internal invariant violation while building the duplicate
    Internal(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldFailed {
                field,
                kind,
                message,
            } => write!(f, "{}: {} ({})", field, kind, message),
            Self::Cancelled => f.write_str("cancelled"),
            Self::NothingToTranslate => f.write_str("nothing to translate"),
            Self::MissingField(name) => write!(f, "missing field '{}'", name),
            Self::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

/// A newly built record and the record it was duplicated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatedRecord {
    pub source_id: RecordId,
    pub record: Record,
}

/// Fate of one input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordResult {
    Duplicated(DuplicatedRecord),
    Skipped(Vec<SkipReason>),
}

impl RecordResult {
    pub fn state(&self) -> RecordState {
        match self {
            Self::Duplicated(_) => RecordState::Duplicated,
            Self::Skipped(_) => RecordState::Skipped,
        }
    }

    pub fn is_duplicated(&self) -> bool {
        matches!(self, Self::Duplicated(_))
    }

    pub fn duplicated(&self) -> Option<&DuplicatedRecord> {
        match self {
            Self::Duplicated(duplicate) => Some(duplicate),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reasons(&self) -> &[SkipReason] {
        match self {
            Self::Duplicated(_) => &[],
            Self::Skipped(reasons) => reasons,
        }
    }
}

/// Aggregate counts for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub succeeded: usize,
    pub skipped: usize,
    /// Field-level retries, i.e. attempts beyond the first
    pub retries: usize,
}

/// Ordered outcome of one batch run, one entry per input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<RecordResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Build a report, deriving the success and skip counts from the results
    pub fn new(results: Vec<RecordResult>, retries: usize) -> Self {
        let succeeded = results.iter().filter(|r| r.is_duplicated()).count();
        let stats = BatchStats {
            succeeded,
            skipped: results.len() - succeeded,
            retries,
        };
        Self { results, stats }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// New records ready to be persisted, in input order
    pub fn duplicated_records(&self) -> impl Iterator<Item = &DuplicatedRecord> {
        self.results.iter().filter_map(RecordResult::duplicated)
    }
}
