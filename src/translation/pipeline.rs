/*!
 * Single-document translation pipeline.
 *
 * Splits one document, hydrates chunk state from its checkpoint, then walks
 * the chunks strictly in index order — sequentially, because translation
 * quality for pronoun and name consistency depends on the preceding chunks'
 * accepted output. The checkpoint is atomically replaced after every chunk
 * transition, so the process can die at any point and lose at most the
 * in-flight attempt.
 *
 * Per-document failures (read errors, exhausted chunks) are reported through
 * `DocumentRunStatus`; only a fatal provider error travels the error channel,
 * because it must stop the whole batch, not just this document.
 */

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::app_config::SplitMode;
use crate::document_processor::{ChunkStatus, Document, TextSplitter};
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::progress::{ChunkProgressStore, ProgressRecord};

use super::refine::DoublePassRefiner;
use super::retry::{ChunkOutcome, RetryOrchestrator};
use super::tracking::RunContext;

/// Terminal state of one document run
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentRunStatus {
    /// Every chunk accepted; output written; checkpoint cleared
    Succeeded {
        /// Chunk count of the document
        chunks_total: usize,
    },
    /// The run finished but some chunks exhausted their budget
    /// (or the document could not be read or written)
    Failed {
        /// The last concrete error for reporting
        error: String,
        /// Chunk count of the document (0 if it was never split)
        chunks_total: usize,
        /// Number of failed chunks
        chunks_failed: usize,
    },
    /// A shutdown request stopped the run between chunks; the checkpoint
    /// holds everything completed so far
    Interrupted,
}

impl DocumentRunStatus {
    fn failed(error: impl Into<String>, chunks_total: usize, chunks_failed: usize) -> Self {
        Self::Failed {
            error: error.into(),
            chunks_total,
            chunks_failed,
        }
    }
}

/// Drives one document from source text to translated output
pub struct DocumentPipeline {
    splitter: TextSplitter,
    split_mode: SplitMode,
    orchestrator: RetryOrchestrator,
    refiner: Option<DoublePassRefiner>,
    store: Arc<ChunkProgressStore>,
    ctx: RunContext,
}

impl DocumentPipeline {
    /// Create a pipeline
    pub fn new(
        splitter: TextSplitter,
        split_mode: SplitMode,
        orchestrator: RetryOrchestrator,
        refiner: Option<DoublePassRefiner>,
        store: Arc<ChunkProgressStore>,
        ctx: RunContext,
    ) -> Self {
        Self {
            splitter,
            split_mode,
            orchestrator,
            refiner,
            store,
            ctx,
        }
    }

    /// Translate one document, checkpointing after every chunk.
    ///
    /// `on_chunk(done, total)` is invoked after each chunk settles, for
    /// progress display.
    pub async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        on_chunk: impl Fn(usize, usize),
    ) -> Result<DocumentRunStatus, TranslationError> {
        let raw_text = match FileManager::read_to_string(input_path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Cannot read {}: {}", input_path.display(), e);
                return Ok(DocumentRunStatus::failed(e.to_string(), 0, 0));
            }
        };

        let mut document = Document::from_text(input_path, raw_text, &self.splitter);
        let key = document.key();
        let name = document.display_name();
        let total = document.chunks.len();

        self.hydrate_from_checkpoint(&mut document, &key, &name);

        for index in 0..total {
            if document.chunks[index].status == ChunkStatus::Done {
                on_chunk(self.done_count(&document), total);
                continue;
            }

            if self.ctx.shutdown.is_requested() {
                info!("[{}] shutdown requested; flushing checkpoint and stopping", name);
                self.flush_checkpoint(&document, &key, &name);
                return Ok(DocumentRunStatus::Interrupted);
            }

            document.chunks[index].mark_translating();
            let chunk = document.chunks[index].clone();

            match self.orchestrator.translate_chunk(&name, &chunk).await {
                Ok(ChunkOutcome::Done { text, attempts }) => {
                    let final_text = match &self.refiner {
                        Some(refiner) => refiner.refine(&name, index, &chunk.text, &text).await,
                        None => text,
                    };
                    document.chunks[index].attempts = attempts;
                    document.chunks[index].mark_done(final_text);
                }
                Ok(ChunkOutcome::Failed { error, attempts }) => {
                    warn!(
                        "[{}] chunk {} failed after {} attempts: {}",
                        name, index, attempts, error
                    );
                    document.chunks[index].attempts = attempts;
                    document.chunks[index].mark_failed(error);
                }
                Ok(ChunkOutcome::Abandoned) => {
                    info!("[{}] shutdown during chunk {}; flushing checkpoint", name, index);
                    document.chunks[index].status = ChunkStatus::Pending;
                    self.flush_checkpoint(&document, &key, &name);
                    return Ok(DocumentRunStatus::Interrupted);
                }
                Err(fatal) => {
                    // The in-flight chunk goes back to Pending: a fatal error
                    // says nothing about this chunk in particular
                    document.chunks[index].status = ChunkStatus::Pending;
                    self.flush_checkpoint(&document, &key, &name);
                    return Err(fatal);
                }
            }

            self.flush_checkpoint(&document, &key, &name);
            on_chunk(self.done_count(&document), total);
        }

        let failed = document.failed_chunks();
        if !failed.is_empty() {
            let last_error = failed
                .last()
                .and_then(|c| c.last_error.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            return Ok(DocumentRunStatus::failed(last_error, total, failed.len()));
        }

        let output = match document.reassemble() {
            Ok(output) => output,
            Err(e) => return Ok(DocumentRunStatus::failed(e.to_string(), total, 0)),
        };

        if let Err(e) = FileManager::atomic_write(output_path, &output) {
            warn!("[{}] failed to write output: {}", name, e);
            return Ok(DocumentRunStatus::failed(e.to_string(), total, 0));
        }

        // The output artifact exists; only now is the checkpoint disposable
        if let Err(e) = self.store.clear(&key) {
            warn!("[{}] failed to clear checkpoint: {}", name, e);
        }

        info!(
            "[{}] translated {} chunks -> {}",
            name,
            total,
            output_path.display()
        );
        Ok(DocumentRunStatus::Succeeded { chunks_total: total })
    }

    fn done_count(&self, document: &Document) -> usize {
        document
            .chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Done)
            .count()
    }

    /// Apply a prior checkpoint when it still matches the document; discard
    /// it (stale source, changed chunking settings) otherwise
    fn hydrate_from_checkpoint(&self, document: &mut Document, key: &str, name: &str) {
        match self.store.load(key) {
            Ok(Some(record)) => {
                if record.matches(document, self.splitter.max_chars(), self.split_mode) {
                    record.apply_to(document);
                    info!(
                        "[{}] resuming: {}/{} chunks already done",
                        name,
                        record.done_count(),
                        document.chunks.len()
                    );
                } else {
                    warn!(
                        "[{}] checkpoint is stale (source or chunk settings changed); restarting",
                        name
                    );
                    if let Err(e) = self.store.clear(key) {
                        warn!("[{}] failed to remove stale checkpoint: {}", name, e);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!("[{}] could not load checkpoint ({}); starting fresh", name, e),
        }
    }

    /// Snapshot current chunk state; a failure to persist is logged, not
    /// fatal, since the worst case is redoing chunks after a crash
    fn flush_checkpoint(&self, document: &Document, key: &str, name: &str) {
        let record = ProgressRecord::from_document(document, self.splitter.max_chars(), self.split_mode);
        if let Err(e) = self.store.save(key, &record) {
            warn!("[{}] failed to save checkpoint: {}", name, e);
        }
    }
}
