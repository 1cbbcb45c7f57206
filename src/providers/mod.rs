/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - OpenAI: chat completions API
 * - Gemini: generateContent API
 * - Mock: scripted provider used by tests and benchmarks
 *
 * Every client satisfies the same [`Provider`] contract, so the translation
 * layer never looks at provider-specific request or response shapes.
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::{ErrorKind, ProviderError};
use crate::translation::prompts::{PromptTemplate, RenderedPrompt};

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod registry;

pub use registry::ProviderRegistry;

/// Provider-neutral description of one translation call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Text to translate
    pub text: String,
    /// Source language tag
    pub source_language: String,
    /// Target language tag
    pub target_language: String,
    /// Model name understood by the provider
    pub model: String,
    /// Prompt template to render
    pub template: PromptTemplate,
    /// Whether to ask the model to leave `<img>` tags alone
    pub preserve_image_tags: bool,
    /// Sampling temperature
    pub temperature: f32,
}

impl ProviderRequest {
    /// Render the prompt template for this request
    pub fn render(&self) -> RenderedPrompt {
        self.template.render(
            &self.text,
            &self.source_language,
            &self.target_language,
            self.preserve_image_tags,
        )
    }
}

/// Common trait for all translation providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Translate one piece of text
    ///
    /// # Arguments
    /// * `request` - Text, languages, model and prompt template
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or a classified error
    async fn translate(&self, request: &ProviderRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider with a tiny translation
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = ProviderRequest {
            text: "Hello".to_string(),
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            model: model.to_string(),
            template: PromptTemplate::default(),
            preserve_image_tags: false,
            temperature: 0.0,
        };
        self.translate(&request).await.map(|_| ())
    }
}

/// Classify a non-success HTTP status shared by the HTTP providers.
///
/// Provider clients refine this with body inspection (model or key errors
/// hidden behind 400/404). Unrecognised statuses are never retried.
pub(crate) fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::AuthError,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
        StatusCode::NOT_FOUND => ErrorKind::UnsupportedModel,
        StatusCode::REQUEST_TIMEOUT => ErrorKind::TransientNetworkError,
        s if s.is_server_error() => ErrorKind::TransientNetworkError,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a transport-level failure from reqwest
pub(crate) fn classify_transport(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        ProviderError::transient(format!("Failed to reach {} API: {}", provider, error))
    } else if error.is_decode() {
        ProviderError::malformed(format!("Failed to decode {} API response: {}", provider, error))
    } else {
        ProviderError::new(
            ErrorKind::Unknown,
            format!("{} API request failed: {}", provider, error),
        )
    }
}

/// Read a `Retry-After` header expressed in seconds
///
/// Values that do not fit a `Duration` are treated as absent.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Trim a response body for inclusion in an error message
pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() > 500 {
        body.chars().take(500).collect()
    } else {
        body.to_string()
    }
}
