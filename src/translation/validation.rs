/*!
 * Output-quality validation gate.
 *
 * Every successful provider response passes through this gate before a chunk
 * is accepted as Done:
 * - minimum length ratio between translation and source, rejecting
 *   suspiciously truncated output
 * - residual source-script ratio, rejecting output that is still largely in
 *   the source language
 * - anti-repetition bound, rejecting degenerate looping output
 *
 * A rejection is a retryable failure: it consumes one attempt and the
 * orchestrator tries again.
 */

use crate::app_config::ValidationConfig;
use crate::language_utils::{residual_scripts, script_ratio, Script};

/// Sources shorter than this skip the length-ratio check; tiny fragments
/// legitimately translate to very different lengths
const MIN_SOURCE_CHARS_FOR_RATIO: usize = 20;

/// Why a translation was rejected by the gate
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// Translation is empty for a non-empty source
    EmptyTranslation,
    /// Translation is too short relative to source
    TranslationTooShort {
        ratio: f64,
        min_ratio: f64,
        source_len: usize,
        translated_len: usize,
    },
    /// Too much of the output is still in the source language's script
    ResidualSourceScript {
        ratio: f64,
        max_ratio: f64,
    },
    /// Output is dominated by a repeated character or word
    ExcessiveRepetition {
        run_length: usize,
        limit: usize,
        repeated: String,
    },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::EmptyTranslation => {
                write!(f, "Translation is empty")
            }
            ValidationIssue::TranslationTooShort {
                ratio,
                min_ratio,
                source_len,
                translated_len,
            } => {
                write!(
                    f,
                    "Translation too short: ratio {:.2} < {:.2} ({} -> {} chars)",
                    ratio, min_ratio, source_len, translated_len
                )
            }
            ValidationIssue::ResidualSourceScript { ratio, max_ratio } => {
                write!(
                    f,
                    "Residual source script: {:.0}% of letters still in source script (max {:.0}%)",
                    ratio * 100.0,
                    max_ratio * 100.0
                )
            }
            ValidationIssue::ExcessiveRepetition {
                run_length,
                limit,
                repeated,
            } => {
                write!(
                    f,
                    "Excessive repetition: {:?} repeated {} times (limit {})",
                    repeated, run_length, limit
                )
            }
        }
    }
}

/// Validation gate configured for one language pair
#[derive(Debug, Clone)]
pub struct OutputValidator {
    config: ValidationConfig,
    /// Scripts that identify leftover source text; empty for
    /// script-indistinguishable pairs, which disables that check
    residual: Vec<Script>,
}

impl OutputValidator {
    /// Build a validator for a language pair
    pub fn new(config: ValidationConfig, source_language: &str, target_language: &str) -> Self {
        Self {
            config,
            residual: residual_scripts(source_language, target_language),
        }
    }

    /// Check a translation against the gate. `Ok(())` means accepted.
    pub fn check(&self, source: &str, translated: &str) -> Result<(), ValidationIssue> {
        let source_len = source.chars().count();
        let translated_len = translated.trim().chars().count();

        if source.trim().is_empty() {
            // Nothing to validate against
            return Ok(());
        }

        if translated_len == 0 {
            return Err(ValidationIssue::EmptyTranslation);
        }

        if source_len >= MIN_SOURCE_CHARS_FOR_RATIO {
            let ratio = translated_len as f64 / source_len as f64;
            if ratio < self.config.min_length_ratio {
                return Err(ValidationIssue::TranslationTooShort {
                    ratio,
                    min_ratio: self.config.min_length_ratio,
                    source_len,
                    translated_len,
                });
            }
        }

        if !self.residual.is_empty() {
            let ratio = script_ratio(translated, &self.residual);
            if ratio > self.config.max_source_script_ratio {
                return Err(ValidationIssue::ResidualSourceScript {
                    ratio,
                    max_ratio: self.config.max_source_script_ratio,
                });
            }
        }

        if let Some((repeated, run_length)) = excessive_run(translated, self.config.repetition_limit) {
            return Err(ValidationIssue::ExcessiveRepetition {
                run_length,
                limit: self.config.repetition_limit,
                repeated,
            });
        }

        Ok(())
    }
}

/// Longest run of an identical non-whitespace character or identical word,
/// if it exceeds the limit
fn excessive_run(text: &str, limit: usize) -> Option<(String, usize)> {
    // Character runs
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if c.is_whitespace() {
            prev = None;
            run = 0;
            continue;
        }
        if Some(c) == prev {
            run += 1;
            if run > limit {
                return Some((c.to_string(), run));
            }
        } else {
            prev = Some(c);
            run = 1;
        }
    }

    // Word runs
    let mut prev_word: Option<&str> = None;
    let mut word_run = 0usize;
    for word in text.split_whitespace() {
        if Some(word) == prev_word {
            word_run += 1;
            if word_run > limit {
                return Some((word.to_string(), word_run));
            }
        } else {
            prev_word = Some(word);
            word_run = 1;
        }
    }

    None
}
