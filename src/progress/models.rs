/*!
 * Persisted progress models.
 *
 * These structures are the on-disk JSON shape of pipeline state. The
 * in-memory chunk states are a cache: everything needed to resume must be
 * reconstructible from a `ProgressRecord` alone.
 */

use serde::{Deserialize, Serialize};

use crate::app_config::SplitMode;
use crate::document_processor::{ChunkStatus, Document};

/// Current checkpoint schema version
pub const PROGRESS_RECORD_VERSION: u32 = 1;

/// Current batch manifest schema version
pub const BATCH_MANIFEST_VERSION: u32 = 1;

/// Persisted state of one chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkProgress {
    /// Chunk index within the document
    pub index: usize,
    /// Lifecycle state at checkpoint time
    pub status: ChunkStatus,
    /// Accepted translation; present only for Done chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    /// Last concrete error; present only for Failed chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Durable per-document checkpoint, atomically replaced after every chunk
/// transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Schema version
    pub version: u32,
    /// Source document path
    pub document_path: String,
    /// SHA-256 of the raw source text; a mismatch on resume means the file
    /// changed and the checkpoint is stale
    pub source_digest: String,
    /// Chunk size limit the document was split with
    pub max_chars: usize,
    /// Split mode the document was split with
    pub split_mode: SplitMode,
    /// Number of chunks the document was split into
    pub chunk_count: usize,
    /// Per-chunk states
    pub chunks: Vec<ChunkProgress>,
    /// Index through which every chunk is Done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_through: Option<usize>,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

impl ProgressRecord {
    /// Snapshot the current chunk states of a document
    pub fn from_document(document: &Document, max_chars: usize, split_mode: SplitMode) -> Self {
        let chunks = document
            .chunks
            .iter()
            .map(|chunk| ChunkProgress {
                index: chunk.index,
                status: chunk.status,
                translation: if chunk.status == ChunkStatus::Done {
                    chunk.translation.clone()
                } else {
                    None
                },
                last_error: if chunk.status == ChunkStatus::Failed {
                    chunk.last_error.clone()
                } else {
                    None
                },
            })
            .collect();

        Self {
            version: PROGRESS_RECORD_VERSION,
            document_path: document.path.display().to_string(),
            source_digest: document.digest.clone(),
            max_chars,
            split_mode,
            chunk_count: document.chunks.len(),
            chunks,
            completed_through: document.completed_through(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this checkpoint belongs to the given document as currently
    /// split. A stale checkpoint (changed source, different chunking
    /// parameters) must be discarded rather than applied.
    pub fn matches(&self, document: &Document, max_chars: usize, split_mode: SplitMode) -> bool {
        self.version == PROGRESS_RECORD_VERSION
            && self.source_digest == document.digest
            && self.max_chars == max_chars
            && self.split_mode == split_mode
            && self.chunk_count == document.chunks.len()
    }

    /// Hydrate a freshly split document from this checkpoint.
    ///
    /// Done chunks get their translation back verbatim and are not re-sent.
    /// Pending, Translating and Failed chunks re-enter as Pending with their
    /// attempt counters reset: budgets are scoped per invocation.
    pub fn apply_to(&self, document: &mut Document) {
        for progress in &self.chunks {
            let Some(chunk) = document.chunks.get_mut(progress.index) else {
                continue;
            };

            if progress.status == ChunkStatus::Done {
                if let Some(translation) = &progress.translation {
                    chunk.mark_done(translation.clone());
                }
            }
        }
    }

    /// Number of Done chunks in the checkpoint
    pub fn done_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Done)
            .count()
    }
}

/// Outcome of one document within a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Fully translated and written out
    Succeeded,
    /// One or more chunks exhausted their attempt budget
    Failed {
        /// The last concrete error for reporting
        error: String,
    },
    /// Already complete before this run; nothing was re-sent
    Skipped,
}

impl DocumentStatus {
    /// Whether the document needs no further work
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }
}

/// One entry in the batch manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Source document path
    pub path: String,
    /// Outcome of the last run that touched this document
    #[serde(flatten)]
    pub status: DocumentStatus,
    /// Chunk count at completion time, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_total: Option<usize>,
    /// Failed chunk count, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_failed: Option<usize>,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Batch-level resume artifact, distinct from per-document checkpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    /// Schema version
    pub version: u32,
    /// Unique id of the batch job
    pub job_id: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
    /// Whether the run tolerates per-document failures
    pub continue_on_error: bool,
    /// Per-document outcomes, in first-seen order
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchManifest {
    /// Start a fresh manifest
    pub fn new(continue_on_error: bool) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: BATCH_MANIFEST_VERSION,
            job_id: uuid::Uuid::new_v4().to_string(),
            created_at: now.clone(),
            updated_at: now,
            continue_on_error,
            outcomes: Vec::new(),
        }
    }

    /// Look up the recorded outcome for a document
    pub fn get(&self, path: &str) -> Option<&DocumentOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    /// Record (or replace) the outcome for a document
    pub fn record(&mut self, outcome: DocumentOutcome) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
        if let Some(existing) = self.outcomes.iter_mut().find(|o| o.path == outcome.path) {
            *existing = outcome;
        } else {
            self.outcomes.push(outcome);
        }
    }

    /// Whether every recorded document settled successfully
    pub fn is_fully_successful(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.status.is_settled())
    }
}
