use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, ProviderError};
use crate::providers::{
    Provider, ProviderRequest, classify_status, classify_transport, retry_after, truncate_body,
};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI client for the chat completions API
///
/// Also works with OpenAI-compatible servers when given a custom endpoint.
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL (optional, defaults to public API)
    endpoint: String,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message, absent for refusals and tool calls
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One generated alternative
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAIRequest {
    /// Create a new chat completion request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: Some(content.into()),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build the request for one provider-neutral translation call
    ///
    /// Without a `{text}` placeholder the instructions become the system message
    /// and the text the user message; otherwise everything is one user message.
    pub fn for_translation(request: &ProviderRequest) -> Self {
        let prompt = request.render();
        let chat = Self::new(&request.model).temperature(request.temperature);
        match prompt.text {
            Some(text) => chat
                .add_message("system", prompt.instructions)
                .add_message("user", text),
            None => chat.add_message("user", prompt.instructions),
        }
    }
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new_with_timeout(api_key, endpoint, Duration::from_secs(30))
    }

    /// Create a new OpenAI client with a request timeout
    pub fn new_with_timeout(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    fn completions_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/chat/completions", base)
    }

    /// Complete a chat request
    pub async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI API error ({}): {}", status, truncate_body(&error_text));
            return Err(Self::classify_error(status, &error_text, wait));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport("OpenAI", e))?;

        serde_json::from_str::<OpenAIResponse>(&body).map_err(|e| {
            debug!("Unparseable OpenAI response: {}", truncate_body(&body));
            ProviderError::malformed(format!("Failed to parse OpenAI API response: {}", e))
        })
    }

    /// Map an error response onto the error taxonomy
    fn classify_error(
        status: reqwest::StatusCode,
        body: &str,
        wait: Option<Duration>,
    ) -> ProviderError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let code = parsed.as_ref().and_then(|e| e.error.code.clone());
        let message = parsed
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| truncate_body(body));
        let message = format!("OpenAI API error ({}): {}", status, message);

        let kind = match code.as_deref() {
            Some("model_not_found") => ErrorKind::UnsupportedModel,
            Some("invalid_api_key") => ErrorKind::AuthError,
            // Quota exhaustion does not clear on its own
            Some("insufficient_quota") => ErrorKind::Unknown,
            _ => match classify_status(status) {
                ErrorKind::UnsupportedModel if !message.contains("model") => ErrorKind::Unknown,
                kind => kind,
            },
        };

        match kind {
            ErrorKind::RateLimited => ProviderError::rate_limited(message, wait),
            kind => ProviderError::new(kind, message),
        }
    }

    /// Extract the translated text from a chat completion
    pub fn extract_text(response: &OpenAIResponse) -> Result<String, ProviderError> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| ProviderError::malformed("OpenAI returned no choices"))?;

        let text = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::malformed(format!(
                    "OpenAI returned an empty message (finish reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })?;

        Ok(text.to_string())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let response = self.complete(OpenAIRequest::for_translation(request)).await?;
        if let Some(usage) = &response.usage {
            debug!(
                "OpenAI usage: {} prompt + {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        Self::extract_text(&response)
    }
}
