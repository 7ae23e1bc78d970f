/*!
 * Retry orchestration for single-chunk translation.
 *
 * The orchestrator drives one chunk through the provider with bounded
 * attempts, exponential backoff with jitter, and the output validation gate.
 * It is modeled as an explicit little state machine (attempt counter, backoff
 * schedule, classified-error branch) rather than hidden control flow, so the
 * policy is testable against the mock client without a network.
 *
 * Classification at this boundary is binary: retryable failures and
 * validation rejections consume attempts and never escape as errors; a fatal
 * provider error aborts the whole pipeline run, because it means every
 * subsequent chunk would fail identically.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::app_config::TranslationCommonConfig;
use crate::document_processor::Chunk;
use crate::errors::TranslationError;
use crate::providers::{TranslationClient, TranslationRequest};

use super::tracking::{AttemptOutcome, AttemptRecord, RunContext};
use super::validation::OutputValidator;

/// Result of orchestrating one chunk.
///
/// Exhausting the attempt budget is an expected outcome, not an error; only
/// fatal provider failures travel the error channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// The translation passed the validation gate
    Done {
        /// Accepted translated text
        text: String,
        /// Attempts consumed, including the successful one
        attempts: u32,
    },
    /// The attempt budget ran out without an accepted result
    Failed {
        /// The last concrete error observed
        error: String,
        /// Attempts consumed
        attempts: u32,
    },
    /// A shutdown request arrived between attempts; the chunk was neither
    /// accepted nor failed and stays pending for the next run
    Abandoned,
}

/// Exponential backoff schedule: wait before the n-th retry is
/// `min(base · 2^(n-1) + jitter, max)`
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    /// Wait before the first retry
    pub base_wait: Duration,
    /// Upper bound on any single wait
    pub max_wait: Duration,
    /// Random jitter added to each wait; spreads retries out when many
    /// chunks hit a shared rate limit simultaneously
    pub jitter: Duration,
}

impl BackoffSchedule {
    /// Wait before retry number `retry` (1-based). Jitter is sampled fresh
    /// on every call.
    pub fn wait_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        let base_ms = self.base_wait.as_millis() as u64;
        let scaled = base_ms.saturating_mul(1u64 << exponent);

        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            rand::rng().random_range(0..=jitter_ms)
        } else {
            0
        };

        Duration::from_millis(scaled.saturating_add(jitter)).min(self.max_wait)
    }
}

/// Retry policy: attempt budget plus backoff schedule
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per chunk per run, first try included
    pub max_attempts: u32,
    /// Backoff between attempts
    pub backoff: BackoffSchedule,
}

impl RetryPolicy {
    /// Build the policy from the common translation config
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: common.retry_count.max(1),
            backoff: BackoffSchedule {
                base_wait: Duration::from_millis(common.retry_backoff_ms),
                max_wait: Duration::from_millis(common.retry_backoff_max_ms),
                jitter: Duration::from_millis(common.retry_jitter_ms),
            },
        }
    }
}

/// Per-request settings shared by every attempt
#[derive(Debug, Clone)]
pub struct RequestSettings {
    /// Rendered system prompt for the first pass
    pub system_prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
}

/// Drives one chunk through the client with retries and validation
pub struct RetryOrchestrator {
    client: Arc<dyn TranslationClient>,
    validator: OutputValidator,
    policy: RetryPolicy,
    settings: RequestSettings,
    ctx: RunContext,
}

impl RetryOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        client: Arc<dyn TranslationClient>,
        validator: OutputValidator,
        policy: RetryPolicy,
        settings: RequestSettings,
        ctx: RunContext,
    ) -> Self {
        Self {
            client,
            validator,
            policy,
            settings,
            ctx,
        }
    }

    /// The configured attempt budget
    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// Translate one chunk with bounded retries.
    ///
    /// Emits one `AttemptRecord` per provider call. Returns `Ok(Done)` once
    /// a response passes the gate, `Ok(Failed)` when the budget is exhausted,
    /// and `Err(Fatal)` immediately on a non-retryable provider error.
    pub async fn translate_chunk(
        &self,
        document: &str,
        chunk: &Chunk,
    ) -> Result<ChunkOutcome, TranslationError> {
        // A blank chunk has nothing to translate; pass the source through so
        // reassembly preserves the original whitespace
        if chunk.is_blank() {
            return Ok(ChunkOutcome::Done {
                text: chunk.text.clone(),
                attempts: 0,
            });
        }

        let mut last_error: Option<String> = None;
        let mut rate_limit_hint: Option<Duration> = None;

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                // The current attempt always finishes; further retries (and
                // their backoff waits) are abandoned on shutdown
                if self.ctx.shutdown.is_requested() {
                    debug!(
                        "[{}] chunk {}: shutdown requested, abandoning after {} attempt(s)",
                        document,
                        chunk.index,
                        attempt - 1
                    );
                    return Ok(ChunkOutcome::Abandoned);
                }

                let computed = self.policy.backoff.wait_for_retry(attempt - 1);
                // A provider wait hint overrides the schedule when larger
                let wait = match rate_limit_hint.take() {
                    Some(hint) => computed.max(hint),
                    None => computed,
                };
                debug!(
                    "[{}] chunk {}: waiting {:?} before attempt {}/{}",
                    document, chunk.index, wait, attempt, self.policy.max_attempts
                );
                tokio::time::sleep(wait).await;
            }

            let request = TranslationRequest::new(&chunk.text, &self.settings.system_prompt)
                .temperature(self.settings.temperature)
                .max_tokens(self.settings.max_tokens);
            let started = Instant::now();

            match self.client.translate(request).await {
                Ok(reply) => match self.validator.check(&chunk.text, &reply.text) {
                    Ok(()) => {
                        self.ctx.attempts.record(
                            AttemptRecord::new(
                                document,
                                chunk.index,
                                attempt,
                                AttemptOutcome::Success,
                                reply.elapsed,
                            )
                            .with_tokens(reply.prompt_tokens, reply.completion_tokens),
                        );
                        return Ok(ChunkOutcome::Done {
                            text: reply.text,
                            attempts: attempt,
                        });
                    }
                    Err(issue) => {
                        let message = issue.to_string();
                        self.ctx.attempts.record(
                            AttemptRecord::new(
                                document,
                                chunk.index,
                                attempt,
                                AttemptOutcome::ValidationRejected(message.clone()),
                                reply.elapsed,
                            )
                            .with_tokens(reply.prompt_tokens, reply.completion_tokens),
                        );
                        last_error = Some(message);
                    }
                },
                Err(error) if error.is_retryable() => {
                    rate_limit_hint = error.retry_hint();
                    let message = error.to_string();
                    self.ctx.attempts.record(AttemptRecord::new(
                        document,
                        chunk.index,
                        attempt,
                        AttemptOutcome::RetryableFailure(message.clone()),
                        started.elapsed(),
                    ));
                    last_error = Some(message);
                }
                Err(error) => {
                    self.ctx.attempts.record(AttemptRecord::new(
                        document,
                        chunk.index,
                        attempt,
                        AttemptOutcome::FatalFailure(error.to_string()),
                        started.elapsed(),
                    ));
                    return Err(TranslationError::Fatal(error));
                }
            }
        }

        Ok(ChunkOutcome::Failed {
            error: last_error.unwrap_or_else(|| "no attempt was made".to_string()),
            attempts: self.policy.max_attempts,
        })
    }
}
