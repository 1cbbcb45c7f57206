use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, ProviderError};
use crate::providers::{
    Provider, ProviderRequest, classify_status, classify_transport, retry_after, truncate_body,
};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client for the generateContent API
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key, sent as `x-goog-api-key`
    api_key: String,
    /// API base URL (optional, defaults to public API)
    endpoint: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A piece of a turn; only text parts are used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

/// generateContent response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
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
    status: Option<String>,
}

impl GenerateContentRequest {
    /// Build a single-turn request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
            generation_config: None,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation_config = Some(GenerationConfig { temperature });
        self
    }

    /// Build the request for one provider-neutral translation call
    pub fn for_translation(request: &ProviderRequest) -> Self {
        Self::new(request.render().combined()).temperature(request.temperature)
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new_with_timeout(api_key, endpoint, Duration::from_secs(30))
    }

    /// Create a new Gemini client with a request timeout
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

    fn generate_url(&self, model: &str) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/models/{}:generateContent", base, model)
    }

    /// Call generateContent for a model
    pub async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let response = self
            .client
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport("Gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, truncate_body(&error_text));
            return Err(Self::classify_error(status, &error_text, wait));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport("Gemini", e))?;

        serde_json::from_str::<GenerateContentResponse>(&body).map_err(|e| {
            debug!("Unparseable Gemini response: {}", truncate_body(&body));
            ProviderError::malformed(format!("Failed to parse Gemini API response: {}", e))
        })
    }

    /// Map an error response onto the error taxonomy
    ///
    /// Gemini reports a bad key as 400 INVALID_ARGUMENT, so the message is inspected.
    fn classify_error(status: StatusCode, body: &str, wait: Option<Duration>) -> ProviderError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let api_status = parsed.as_ref().and_then(|e| e.error.status.clone());
        let message = parsed
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| truncate_body(body));

        let kind = if status == StatusCode::BAD_REQUEST && message.contains("API key") {
            ErrorKind::AuthError
        } else {
            match api_status.as_deref() {
                Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") => ErrorKind::AuthError,
                Some("RESOURCE_EXHAUSTED") => ErrorKind::RateLimited,
                Some("UNAVAILABLE") | Some("DEADLINE_EXCEEDED") => ErrorKind::TransientNetworkError,
                _ => classify_status(status),
            }
        };

        let message = format!("Gemini API error ({}): {}", status, message);
        match kind {
            ErrorKind::RateLimited => ProviderError::rate_limited(message, wait),
            kind => ProviderError::new(kind, message),
        }
    }

    /// Extract the translated text from a response
    pub fn extract_text(response: &GenerateContentResponse) -> Result<String, ProviderError> {
        let Some(candidate) = response.candidates.first() else {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .unwrap_or("no candidates");
            return Err(ProviderError::malformed(format!(
                "Gemini returned no candidates ({})",
                reason
            )));
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect();

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::malformed(format!(
                "Gemini returned an empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl Provider for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn translate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let response = self
            .generate(&request.model, GenerateContentRequest::for_translation(request))
            .await?;
        Self::extract_text(&response)
    }
}
