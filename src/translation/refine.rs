/*!
 * Optional second-pass refinement of accepted chunks.
 *
 * The refiner runs only on chunks that already passed validation. Its call
 * is narrow cleanup (leftover untranslated fragments, awkward phrasing,
 * punctuation), not re-translation, and it must never regress quality: the
 * refined text goes through the same validation gate, and on any failure —
 * client error of any class or a gate rejection — the first-pass text is
 * kept unchanged. Refinement is never retried and never fails a chunk.
 */

use std::sync::Arc;

use log::{debug, warn};

use crate::providers::{TranslationClient, TranslationRequest};

use super::retry::RequestSettings;
use super::tracking::{AttemptOutcome, AttemptRecord, RunContext};
use super::validation::OutputValidator;

/// Second-pass cleanup for accepted translations
pub struct DoublePassRefiner {
    client: Arc<dyn TranslationClient>,
    validator: OutputValidator,
    settings: RequestSettings,
    ctx: RunContext,
}

impl DoublePassRefiner {
    /// Create a new refiner. `settings.system_prompt` should be the rendered
    /// refine prompt, not the translation prompt.
    pub fn new(
        client: Arc<dyn TranslationClient>,
        validator: OutputValidator,
        settings: RequestSettings,
        ctx: RunContext,
    ) -> Self {
        Self {
            client,
            validator,
            settings,
            ctx,
        }
    }

    /// Refine an accepted translation, returning the refined text when it
    /// passes the gate and the first-pass text otherwise
    pub async fn refine(
        &self,
        document: &str,
        chunk_index: usize,
        source: &str,
        first_pass: &str,
    ) -> String {
        if first_pass.trim().is_empty() {
            return first_pass.to_string();
        }

        let request = TranslationRequest::new(first_pass, &self.settings.system_prompt)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        match self.client.translate(request).await {
            Ok(reply) => match self.validator.check(source, &reply.text) {
                Ok(()) => {
                    debug!("[{}] chunk {}: refinement accepted", document, chunk_index);
                    self.ctx.attempts.record(
                        AttemptRecord::new(
                            document,
                            chunk_index,
                            1,
                            AttemptOutcome::Success,
                            reply.elapsed,
                        )
                        .with_tokens(reply.prompt_tokens, reply.completion_tokens),
                    );
                    reply.text
                }
                Err(issue) => {
                    warn!(
                        "[{}] chunk {}: refinement rejected ({}), keeping first pass",
                        document, chunk_index, issue
                    );
                    first_pass.to_string()
                }
            },
            Err(error) => {
                // Refinement errors, even fatal-class ones, degrade to the
                // first pass; a systemic failure will surface on the next
                // chunk's first pass
                warn!(
                    "[{}] chunk {}: refinement call failed ({}), keeping first pass",
                    document, chunk_index, error
                );
                first_pass.to_string()
            }
        }
    }
}
