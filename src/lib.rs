/*!
 * # booktrans - AI Document Translation
 *
 * A Rust library for chunked, resumable translation of large text documents
 * using AI.
 *
 * ## Features
 *
 * - Split large documents into bounded-size, paragraph-respecting chunks
 * - Translate chunks using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API
 *   - Anthropic API
 *   - LM Studio (OpenAI-compatible local server)
 * - Bounded retries with exponential backoff and jitter
 * - Output-quality validation (length ratio, residual source script,
 *   repetition) before any chunk is accepted
 * - Optional second cleanup pass on accepted chunks
 * - Atomic per-document checkpoints: interrupt at any point, resume without
 *   redoing completed chunks
 * - Batch processing across documents with a bounded worker pool and a
 *   durable batch manifest
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document_processor`: Document model and text splitting
 * - `translation`: AI-powered translation pipeline:
 *   - `translation::core`: Provider dispatch behind one client trait
 *   - `translation::retry`: Retry orchestration and backoff
 *   - `translation::validation`: Output-quality gate
 *   - `translation::refine`: Optional second-pass cleanup
 *   - `translation::pipeline`: Single-document pipeline with checkpointing
 *   - `translation::batch`: Batch controller and resume manifest
 * - `progress`: Durable checkpoint and manifest stores
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language codes and script classification
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document_processor;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document_processor::{Chunk, ChunkStatus, Document, TextSplitter};
pub use errors::{AppError, CheckpointError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match};
pub use translation::TranslationService;
