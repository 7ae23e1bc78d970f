/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also serves LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scripted client for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::ProviderError;

/// One translation request as seen at the orchestrator boundary
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Source text of a single chunk
    pub text: String,
    /// System prompt guiding the model
    pub system_prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
}

impl TranslationRequest {
    /// Build a request for one chunk
    pub fn new(text: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A provider's answer to one translation request
#[derive(Debug, Clone)]
pub struct TranslationReply {
    /// The translated text
    pub text: String,
    /// Prompt token count, if the provider reports usage
    pub prompt_tokens: Option<u64>,
    /// Completion token count, if the provider reports usage
    pub completion_tokens: Option<u64>,
    /// Wall-clock time of the API call
    pub elapsed: Duration,
}

/// Common interface over all translation backends.
///
/// The retry orchestrator depends only on this trait, so retry and
/// validation policy stay unit-testable against the mock client without any
/// network. Implementations must map every failure onto the closed
/// `ProviderError` set; that classification is what decides retry vs abort.
#[async_trait]
pub trait TranslationClient: Send + Sync + Debug {
    /// Perform one translation call
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationReply, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Provider/model description for logs and attempt records
    fn describe(&self) -> String;
}

/// Map a reqwest transport failure onto the classified error set
pub(crate) fn classify_send_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else {
        ProviderError::Connection(error.to_string())
    }
}

/// Map a non-success HTTP response onto the classified error set,
/// consuming the body for the error message
pub(crate) async fn classify_error_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error response body".to_string());

    match status {
        429 => ProviderError::RateLimited { message, retry_after },
        code @ 500..=599 => ProviderError::ServerError { status_code: code, message },
        401 | 403 => ProviderError::AuthFailed(message),
        _ => ProviderError::InvalidRequest(format!("HTTP {}: {}", status, message)),
    }
}

pub mod ollama;
pub mod openai;
pub mod anthropic;
pub mod mock;
