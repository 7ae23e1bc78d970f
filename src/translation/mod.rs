/*!
 * Translation pipeline for chunked document translation using AI providers.
 *
 * This module contains the core machinery for driving documents through a
 * translation backend. It is split into several submodules:
 *
 * - `core`: TranslationService dispatching to the configured provider
 * - `retry`: Retry orchestration with backoff and the validation gate
 * - `validation`: Output-quality checks applied to every response
 * - `refine`: Optional second cleanup pass on accepted chunks
 * - `pipeline`: Single-document pipeline with checkpointing
 * - `batch`: Batch controller with a worker pool and resume manifest
 * - `tracking`: Attempt records, token accounting and the run context
 */

// Re-export main types for easier usage
pub use self::batch::{BatchController, BatchOptions, BatchResult};
pub use self::core::{render_prompt, TranslationService};
pub use self::pipeline::{DocumentPipeline, DocumentRunStatus};
pub use self::refine::DoublePassRefiner;
pub use self::retry::{BackoffSchedule, ChunkOutcome, RequestSettings, RetryOrchestrator, RetryPolicy};
pub use self::tracking::{
    AttemptLogger, AttemptOutcome, AttemptRecord, ConsoleAttemptLogger, MemoryAttemptLogger,
    RunContext, ShutdownFlag, TokenUsageStats,
};
pub use self::validation::{OutputValidator, ValidationIssue};

// Submodules
pub mod batch;
pub mod core;
pub mod pipeline;
pub mod refine;
pub mod retry;
pub mod tracking;
pub mod validation;
