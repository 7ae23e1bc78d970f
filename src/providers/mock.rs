/*!
 * Mock client implementation for testing.
 *
 * This module provides a scripted `TranslationClient` that simulates the
 * behaviors the pipeline must handle:
 * - `MockClient::working()` - Always succeeds with translated text
 * - `MockClient::always_retryable()` - Always fails with a retryable error
 * - `MockClient::fatal_auth()` - Always fails with a fatal error
 * - `MockClient::succeed_after(n)` - Retryable failures, then success
 * - low-quality outputs that must be rejected by the validation gate
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::errors::ProviderError;
use crate::providers::{TranslationClient, TranslationReply, TranslationRequest};

/// Behavior mode for the mock client
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with a retryable server error
    AlwaysRetryable,
    /// Always fails with a rate-limit error carrying a wait hint
    RateLimited { hint_ms: u64 },
    /// Always fails with a fatal authentication error
    FatalAuth,
    /// Fails with retryable errors for the first `failures` requests,
    /// then succeeds
    SucceedAfter { failures: usize },
    /// Returns a response far shorter than the source
    Truncated,
    /// Returns the source text untouched
    SourceEcho,
    /// Returns output dominated by one repeated word
    Repetitive,
    /// Simulates a slow response (for shutdown testing)
    Slow { delay_ms: u64 },
}

/// Scripted translation client for exercising retry, validation and batch
/// behavior without a network
#[derive(Debug)]
pub struct MockClient {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared across clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&TranslationRequest) -> String>,
    /// When set, requests whose text contains this marker fail with a
    /// retryable error regardless of the behavior mode
    fail_when_contains: Option<String>,
}

impl MockClient {
    /// Create a new mock client with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            fail_when_contains: None,
        }
    }

    /// Create a working mock client that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock client that always fails with a retryable error
    pub fn always_retryable() -> Self {
        Self::new(MockBehavior::AlwaysRetryable)
    }

    /// Create a mock client that always fails with a fatal auth error
    pub fn fatal_auth() -> Self {
        Self::new(MockBehavior::FatalAuth)
    }

    /// Create a mock client that succeeds after `failures` retryable errors
    pub fn succeed_after(failures: usize) -> Self {
        Self::new(MockBehavior::SucceedAfter { failures })
    }

    /// Create a mock that returns truncated responses
    pub fn truncated() -> Self {
        Self::new(MockBehavior::Truncated)
    }

    /// Create a mock that echoes the source text back untranslated
    pub fn source_echo() -> Self {
        Self::new(MockBehavior::SourceEcho)
    }

    /// Create a mock that returns degenerate repetitive output
    pub fn repetitive() -> Self {
        Self::new(MockBehavior::Repetitive)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Fail (retryably) any request whose text contains the marker
    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.fail_when_contains = Some(marker.into());
        self
    }

    /// Number of translate calls received so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn success(text: String, started: Instant) -> TranslationReply {
        TranslationReply {
            prompt_tokens: Some((text.len() / 4) as u64),
            completion_tokens: Some((text.len() / 4) as u64),
            elapsed: started.elapsed(),
            text,
        }
    }
}

impl Clone for MockClient {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            fail_when_contains: self.fail_when_contains.clone(),
        }
    }
}

#[async_trait]
impl TranslationClient for MockClient {
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationReply, ProviderError> {
        let started = Instant::now();
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_when_contains {
            if request.text.contains(marker.as_str()) {
                return Err(ProviderError::ServerError {
                    status_code: 503,
                    message: format!("Simulated failure for marked text (request #{})", count + 1),
                });
            }
        }

        match self.behavior {
            MockBehavior::Working => {
                let text = if let Some(generator) = self.custom_response {
                    generator(&request)
                } else {
                    format!("[translated] {}", request.text)
                };
                Ok(Self::success(text, started))
            }

            MockBehavior::AlwaysRetryable => Err(ProviderError::ServerError {
                status_code: 503,
                message: format!("Simulated server failure (request #{})", count + 1),
            }),

            MockBehavior::RateLimited { hint_ms } => Err(ProviderError::RateLimited {
                message: "Simulated rate limit".to_string(),
                retry_after: Some(Duration::from_millis(hint_ms)),
            }),

            MockBehavior::FatalAuth => Err(ProviderError::AuthFailed(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::SucceedAfter { failures } => {
                if count < failures {
                    Err(ProviderError::Timeout(format!(
                        "Simulated timeout (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(Self::success(format!("[translated] {}", request.text), started))
                }
            }

            MockBehavior::Truncated => {
                let text: String = request.text.chars().take(3).collect();
                Ok(Self::success(text, started))
            }

            MockBehavior::SourceEcho => Ok(Self::success(request.text.clone(), started)),

            MockBehavior::Repetitive => {
                let copies = request.text.len().max(100) / 5 + 5;
                Ok(Self::success("spam ".repeat(copies), started))
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Self::success(format!("[translated] {}", request.text), started))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::FatalAuth => Err(ProviderError::AuthFailed(
                "Simulated invalid API key".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        format!("mock/{:?}", self.behavior)
    }
}
