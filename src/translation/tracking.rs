/*!
 * Attempt tracking, token accounting and the run context.
 *
 * Every provider call the orchestrator makes emits one `AttemptRecord` to an
 * `AttemptLogger` collaborator. Loggers are best-effort: recording must never
 * fail the pipeline, so the trait is infallible and implementations swallow
 * their own errors.
 *
 * `RunContext` is the explicitly constructed bundle (attempt sink, shutdown
 * flag) that the controller passes down into the batch controller and the
 * orchestrator; there is no module-level global state and no ambient signal
 * handler. The top-level caller decides when to flip the shutdown flag.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};
use parking_lot::Mutex;

/// Result class of one translation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The provider answered and the output passed the validation gate
    Success,
    /// A transient transport failure; will be retried if budget remains
    RetryableFailure(String),
    /// The provider answered but the output was rejected by the gate
    ValidationRejected(String),
    /// A fatal failure that aborts the pipeline run
    FatalFailure(String),
}

impl AttemptOutcome {
    /// Short tag for log lines
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::RetryableFailure(_) => "retryable",
            Self::ValidationRejected(_) => "rejected",
            Self::FatalFailure(_) => "fatal",
        }
    }
}

/// One entry in the append-only attempt log
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Document the chunk belongs to
    pub document: String,
    /// Chunk index within the document
    pub chunk_index: usize,
    /// Attempt number, starting at 1
    pub attempt: u32,
    /// UTC timestamp (RFC 3339)
    pub timestamp: String,
    /// What happened
    pub outcome: AttemptOutcome,
    /// Wall-clock time of the attempt in milliseconds
    pub elapsed_ms: u64,
    /// Prompt token count, if reported
    pub prompt_tokens: Option<u64>,
    /// Completion token count, if reported
    pub completion_tokens: Option<u64>,
}

impl AttemptRecord {
    /// Build a record stamped with the current time
    pub fn new(
        document: impl Into<String>,
        chunk_index: usize,
        attempt: u32,
        outcome: AttemptOutcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            document: document.into(),
            chunk_index,
            attempt,
            timestamp: Utc::now().to_rfc3339(),
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Attach token usage reported by the provider
    pub fn with_tokens(mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self
    }
}

/// Sink for attempt records. Implementations must not fail the pipeline.
pub trait AttemptLogger: Send + Sync {
    /// Record one attempt
    fn record(&self, record: AttemptRecord);
}

/// Logger that writes attempt records to the log facade
#[derive(Debug, Default)]
pub struct ConsoleAttemptLogger;

impl AttemptLogger for ConsoleAttemptLogger {
    fn record(&self, record: AttemptRecord) {
        match &record.outcome {
            AttemptOutcome::Success => debug!(
                "[{}] chunk {} attempt {} ok in {}ms",
                record.document, record.chunk_index, record.attempt, record.elapsed_ms
            ),
            AttemptOutcome::RetryableFailure(e) | AttemptOutcome::ValidationRejected(e) => warn!(
                "[{}] chunk {} attempt {} {}: {}",
                record.document,
                record.chunk_index,
                record.attempt,
                record.outcome.tag(),
                e
            ),
            AttemptOutcome::FatalFailure(e) => warn!(
                "[{}] chunk {} attempt {} fatal: {}",
                record.document, record.chunk_index, record.attempt, e
            ),
        }
    }
}

/// In-memory logger that keeps every record and running token totals.
/// Used for cost accounting and by the test suite.
#[derive(Default)]
pub struct MemoryAttemptLogger {
    records: Mutex<Vec<AttemptRecord>>,
    stats: Mutex<TokenUsageStats>,
}

impl MemoryAttemptLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records.lock().clone()
    }

    /// Number of records so far
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Human-readable token usage summary
    pub fn summary(&self) -> String {
        self.stats.lock().summary()
    }

    /// Total tokens consumed across all attempts
    pub fn total_tokens(&self) -> u64 {
        self.stats.lock().total_tokens
    }
}

impl AttemptLogger for MemoryAttemptLogger {
    fn record(&self, record: AttemptRecord) {
        {
            let mut stats = self.stats.lock();
            stats.add_token_usage(record.prompt_tokens, record.completion_tokens);
            stats.api_duration += Duration::from_millis(record.elapsed_ms);
        }
        self.records.lock().push(record);
    }
}

/// Token usage statistics for tracking API consumption
#[derive(Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
        }
    }

    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Cooperative cancellation flag, shared between the top-level caller and
/// every worker. Checked between chunks and between documents; the pipeline
/// flushes its checkpoint before honoring it, so at most the in-flight
/// attempt is lost.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clean shutdown
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Explicitly constructed context threaded through the batch controller and
/// the retry orchestrator
#[derive(Clone)]
pub struct RunContext {
    /// Sink for per-attempt records
    pub attempts: Arc<dyn AttemptLogger>,
    /// Cooperative cancellation flag
    pub shutdown: ShutdownFlag,
}

impl RunContext {
    /// Build a context around an attempt sink
    pub fn new(attempts: Arc<dyn AttemptLogger>) -> Self {
        Self {
            attempts,
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Context that logs attempts to the log facade
    pub fn with_console_logger() -> Self {
        Self::new(Arc::new(ConsoleAttemptLogger))
    }
}
