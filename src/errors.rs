/*!
 * Error types for the booktrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. The provider error
 * set is closed: every failure a translation backend can produce maps onto one
 * of its variants, and `is_retryable()` is the single source of truth for the
 * retry/abort decision in the orchestrator.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling a translation provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the request due to rate limiting.
    /// May carry a suggested wait duration parsed from a Retry-After header.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Error message from the API
        message: String,
        /// Suggested wait before retrying, if the provider sent one
        retry_after: Option<Duration>,
    },

    /// The request timed out before a response arrived
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The provider responded with a server-side (5xx) error
    #[error("Server error ({status_code}): {message}")]
    ServerError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Authentication or authorization failed
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The request itself was malformed or rejected as invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A successful response could not be parsed
    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether this failure is transient and worth retrying with backoff.
    ///
    /// Timeouts, connection errors, rate limits and 5xx responses are
    /// retryable. Everything else (auth, malformed request, unparseable
    /// response) indicates a systemic problem that every subsequent request
    /// would hit identically, so it is treated as fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Connection(_) | Self::ServerError { .. }
        )
    }

    /// The wait hint attached to a rate-limit error, if any
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Errors that cross the retry-orchestrator boundary.
///
/// Transient transport errors and validation rejections are handled inside the
/// orchestrator and never appear here; a chunk that exhausts its attempt
/// budget is reported through `ChunkOutcome::Failed`, not as an error.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A fatal provider error that poisons the whole run: every subsequent
    /// chunk would fail the same way, so the pipeline stops immediately.
    #[error("Fatal provider error: {0}")]
    Fatal(#[from] ProviderError),

    /// The per-chunk attempt budget was exhausted without an accepted result
    #[error("Chunk {chunk_index} failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Index of the failed chunk
        chunk_index: usize,
        /// Number of attempts consumed
        attempts: u32,
        /// The last concrete error observed
        last_error: String,
    },
}

/// Errors that can occur while reading or writing checkpoint artifacts
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The checkpoint file exists but could not be parsed
    #[error("Corrupt checkpoint at {path}: {reason}")]
    Corrupt {
        /// Path of the offending file
        path: String,
        /// Parse failure description
        reason: String,
    },

    /// An I/O failure while persisting or loading a checkpoint
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from checkpoint handling
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Configuration problem detected before any work started
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
