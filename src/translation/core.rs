/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, which wraps the
 * configured provider client behind the `TranslationClient` trait. It is
 * purely transport: one request in, one classified result out. Retry policy,
 * validation and prompting live in the orchestrator.
 */

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{TranslationClient, TranslationReply, TranslationRequest};

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// Ollama LLM service
    Ollama {
        /// Client instance
        client: Ollama,
    },

    /// OpenAI API service
    OpenAI {
        /// Client instance
        client: OpenAI,
    },

    /// LM Studio local server (OpenAI-compatible)
    LMStudio {
        /// Client instance (OpenAI-compatible)
        client: OpenAI,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Client-side request pacing for providers with a requests-per-minute
/// limit. Spaces requests evenly instead of bursting into the limit.
#[derive(Debug)]
struct RequestPacer {
    /// Minimum interval between request starts
    min_interval: Duration,
    /// Start time of the most recent request
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl RequestPacer {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            min_interval: Duration::from_secs(60) / requests_per_minute,
            last: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait until this request is allowed to start
    async fn wait_turn(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let next_allowed = previous + self.min_interval;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep(next_allowed - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Main translation service dispatching to the configured provider
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,

    /// Optional client-side rate limiting
    pacer: Option<RequestPacer>,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let endpoint = config.get_endpoint();
        validate_endpoint(&endpoint)?;
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new_with_config(endpoint, timeout_secs),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new_with_config(config.get_api_key(), endpoint, timeout_secs),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new_with_config(api_key, endpoint, timeout_secs),
                }
            },
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new_with_config(config.get_api_key(), endpoint, timeout_secs),
            },
        };

        let pacer = config
            .get_rate_limit()
            .filter(|limit| *limit > 0)
            .map(RequestPacer::new);

        Ok(Self {
            provider,
            config,
            pacer,
        })
    }

    /// Get the maximum number of completion tokens for a given model
    pub fn max_tokens_for_model(model: &str) -> u32 {
        match model {
            // OpenAI models
            "gpt-4" | "gpt-4-0613" => 8192,
            "gpt-4o" | "gpt-4o-mini" | "gpt-4-turbo" => 4096,
            "gpt-3.5-turbo" | "gpt-3.5-turbo-0613" => 4096,

            // Anthropic models
            m if m.starts_with("claude-3-5") => 8192,
            m if m.starts_with("claude-3") => 4096,

            // Default for unknown and local models
            _ => 4096,
        }
    }
}

#[async_trait]
impl TranslationClient for TranslationService {
    async fn translate(&self, request: TranslationRequest) -> Result<TranslationReply, ProviderError> {
        if let Some(pacer) = &self.pacer {
            pacer.wait_turn().await;
        }

        let start_time = Instant::now();
        let model = self.config.get_model();

        match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let generation = GenerationRequest::new(&model, &request.text)
                    .system(&request.system_prompt)
                    .temperature(request.temperature)
                    .num_predict(request.max_tokens);

                let response = client.generate(generation).await?;

                Ok(TranslationReply {
                    text: response.response,
                    prompt_tokens: response.prompt_eval_count,
                    completion_tokens: response.eval_count,
                    elapsed: start_time.elapsed(),
                })
            },
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let completion = OpenAIRequest::new(&model)
                    .add_message("system", &request.system_prompt)
                    .add_message("user", &request.text)
                    .temperature(request.temperature)
                    .max_tokens(request.max_tokens);

                let response = client.complete(completion).await?;
                let text = OpenAI::extract_text(&response)?;

                let (prompt_tokens, completion_tokens) = match response.usage.as_ref() {
                    Some(usage) => (
                        Some(usage.prompt_tokens as u64),
                        Some(usage.completion_tokens as u64),
                    ),
                    None => (None, None),
                };

                Ok(TranslationReply {
                    text,
                    prompt_tokens,
                    completion_tokens,
                    elapsed: start_time.elapsed(),
                })
            },
            TranslationProviderImpl::Anthropic { client } => {
                let messages = AnthropicRequest::new(&model, request.max_tokens)
                    .system(&request.system_prompt)
                    .add_message("user", &request.text)
                    .temperature(request.temperature);

                let response = client.complete(messages).await?;
                let text = Anthropic::extract_text(&response);

                Ok(TranslationReply {
                    text,
                    prompt_tokens: Some(response.usage.input_tokens as u64),
                    completion_tokens: Some(response.usage.output_tokens as u64),
                    elapsed: start_time.elapsed(),
                })
            },
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let model = self.config.get_model();
        match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                client.version().await?;
                Ok(())
            },
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                client.test_connection(&model).await
            },
            TranslationProviderImpl::Anthropic { client } => {
                client.test_connection(&model).await
            },
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.get_model())
    }
}

/// Reject malformed endpoints before any request is made
fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Ok(());
    }

    let candidate = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&candidate)?;
    url.host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?;

    Ok(())
}

/// Render a prompt template, substituting the language placeholders
pub fn render_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    let source_name = crate::language_utils::get_language_name(source_language)
        .unwrap_or_else(|_| source_language.to_string());
    let target_name = crate::language_utils::get_language_name(target_language)
        .unwrap_or_else(|_| target_language.to_string());

    template
        .replace("{source_language}", &source_name)
        .replace("{target_language}", &target_name)
}
