/*!
 * Common test utilities for the booktrans test suite
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use booktrans::app_config::{SplitMode, ValidationConfig};
use booktrans::document_processor::TextSplitter;
use booktrans::progress::{BatchProgressStore, ChunkProgressStore};
use booktrans::providers::TranslationClient;
use booktrans::translation::{
    BackoffSchedule, BatchController, BatchOptions, DocumentPipeline, MemoryAttemptLogger,
    OutputValidator, RequestSettings, RetryOrchestrator, RetryPolicy, RunContext,
};

/// Initialize logging for a test run; honors RUST_LOG
#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A multi-paragraph sample document with blank-line separators
pub fn sample_document(paragraphs: usize) -> String {
    let mut text = String::new();
    for i in 0..paragraphs {
        text.push_str(&format!(
            "This is paragraph number {} of the sample document, with enough text to validate.\n\n",
            i
        ));
    }
    text
}

/// Retry policy with no real waiting, for fast tests
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: BackoffSchedule {
            base_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            jitter: Duration::ZERO,
        },
    }
}

/// Request settings for tests
pub fn test_settings() -> RequestSettings {
    RequestSettings {
        system_prompt: "Translate the text.".to_string(),
        temperature: 0.3,
        max_tokens: 4096,
    }
}

/// Default validator for a Latin-script pair (residual check disabled)
pub fn latin_validator() -> OutputValidator {
    OutputValidator::new(ValidationConfig::default(), "fr", "en")
}

/// A run context backed by an in-memory attempt log
pub fn memory_ctx() -> (RunContext, Arc<MemoryAttemptLogger>) {
    let log = Arc::new(MemoryAttemptLogger::new());
    (RunContext::new(log.clone()), log)
}

/// Build an orchestrator over any client, with zero backoff
pub fn make_orchestrator(
    client: Arc<dyn TranslationClient>,
    max_attempts: u32,
    ctx: RunContext,
) -> RetryOrchestrator {
    RetryOrchestrator::new(client, latin_validator(), fast_policy(max_attempts), test_settings(), ctx)
}

/// Build a single-document pipeline over any client, checkpointing under
/// `state_dir`, without the refinement pass
pub fn make_pipeline(
    client: Arc<dyn TranslationClient>,
    state_dir: &Path,
    max_chars: usize,
    max_attempts: u32,
    ctx: RunContext,
) -> Result<DocumentPipeline> {
    let splitter = TextSplitter::new(max_chars, SplitMode::Paragraphs)?;
    let orchestrator = make_orchestrator(client, max_attempts, ctx.clone());
    let store = Arc::new(ChunkProgressStore::new(state_dir)?);

    Ok(DocumentPipeline::new(
        splitter,
        SplitMode::Paragraphs,
        orchestrator,
        None,
        store,
        ctx,
    ))
}

/// Batch options for tests: outputs next to inputs, no history retention
pub fn default_batch_options(continue_on_error: bool, workers: usize) -> BatchOptions {
    BatchOptions {
        force_overwrite: false,
        force_rerun: false,
        continue_on_error,
        retain_history: false,
        workers,
        target_language: "en".to_string(),
        output_dir: None,
    }
}

/// Build a batch controller over any client
pub fn make_batch_controller(
    client: Arc<dyn TranslationClient>,
    state_dir: &Path,
    max_chars: usize,
    max_attempts: u32,
    options: BatchOptions,
    ctx: RunContext,
) -> Result<BatchController> {
    let pipeline = Arc::new(make_pipeline(
        client,
        state_dir,
        max_chars,
        max_attempts,
        ctx.clone(),
    )?);
    let chunk_store = Arc::new(ChunkProgressStore::new(state_dir)?);
    let manifest_store = Arc::new(BatchProgressStore::new(state_dir)?);

    Ok(BatchController::new(
        pipeline,
        chunk_store,
        manifest_store,
        options,
        ctx,
    ))
}
