/*!
 * Batch processing of documents.
 *
 * This module contains the BatchController, which iterates a collection of
 * documents, applies the single-document pipeline to each, and maintains a
 * batch-level resume manifest distinct from per-document checkpoints.
 *
 * Documents run on a bounded worker pool. Each worker exclusively owns its
 * document's chunks and checkpoint; the only shared state is the manifest,
 * which is updated under a lock and atomically replaced on disk. A fatal
 * provider error aborts the whole batch: no new document starts, in-flight
 * workers stop at their next chunk boundary, and untouched documents keep
 * whatever checkpoints they had.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::document_processor::document_key;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::progress::{
    BatchManifest, BatchProgressStore, ChunkProgressStore, DocumentOutcome, DocumentStatus,
};

use super::pipeline::{DocumentPipeline, DocumentRunStatus};
use super::tracking::RunContext;

/// Options controlling one batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Re-translate documents whose output already exists
    pub force_overwrite: bool,
    /// Ignore outcomes recorded by a prior interrupted run
    pub force_rerun: bool,
    /// Keep going after a document fails
    pub continue_on_error: bool,
    /// Keep the manifest after a fully successful batch
    pub retain_history: bool,
    /// Worker pool size
    pub workers: usize,
    /// Target language code, used for output naming
    pub target_language: String,
    /// Where outputs go; next to each input when None
    pub output_dir: Option<PathBuf>,
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Manifest job id
    pub job_id: String,
    /// Outcome per document that settled (or was settled by a prior run)
    pub outcomes: Vec<DocumentOutcome>,
    /// The batch stopped before scheduling every document
    pub halted_early: bool,
    /// A shutdown request interrupted the run
    pub interrupted: bool,
}

impl BatchResult {
    /// Documents that failed, for summary reporting
    pub fn failures(&self) -> Vec<&DocumentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DocumentStatus::Failed { .. }))
            .collect()
    }

    /// Whether every settled document succeeded or was skipped
    pub fn is_fully_successful(&self) -> bool {
        !self.halted_early
            && !self.interrupted
            && self.outcomes.iter().all(|o| o.status.is_settled())
    }
}

/// Iterates documents through the single-document pipeline with a bounded
/// worker pool and a durable batch manifest
pub struct BatchController {
    pipeline: Arc<DocumentPipeline>,
    chunk_store: Arc<ChunkProgressStore>,
    manifest_store: Arc<BatchProgressStore>,
    options: BatchOptions,
    ctx: RunContext,
}

impl BatchController {
    /// Create a batch controller
    pub fn new(
        pipeline: Arc<DocumentPipeline>,
        chunk_store: Arc<ChunkProgressStore>,
        manifest_store: Arc<BatchProgressStore>,
        options: BatchOptions,
        ctx: RunContext,
    ) -> Self {
        Self {
            pipeline,
            chunk_store,
            manifest_store,
            options,
            ctx,
        }
    }

    /// Run the batch. `on_chunk_progress(path, done, total)` fires after each
    /// chunk of any document settles.
    ///
    /// Returns `Err` only for a fatal provider error, after in-flight workers
    /// have stopped and the manifest has been flushed.
    pub async fn run<F>(
        &self,
        documents: Vec<PathBuf>,
        on_chunk_progress: F,
    ) -> Result<BatchResult, TranslationError>
    where
        F: Fn(&Path, usize, usize) + Clone + Send + Sync + 'static,
    {
        let manifest = self.load_or_create_manifest()?;
        let job_id = manifest.job_id.clone();
        let total_documents = documents.len();
        info!(
            "Starting batch {} with {} documents ({} workers)",
            job_id,
            total_documents,
            self.options.workers.max(1)
        );

        let manifest = Arc::new(Mutex::new(manifest));
        let fatal: Arc<Mutex<Option<TranslationError>>> = Arc::new(Mutex::new(None));
        let halted = Arc::new(AtomicBool::new(false));

        let results: Vec<Option<(usize, DocumentOutcome)>> = stream::iter(
            documents.iter().cloned().enumerate(),
        )
        .map(|(index, path)| {
            let pipeline = Arc::clone(&self.pipeline);
            let chunk_store = Arc::clone(&self.chunk_store);
            let manifest = Arc::clone(&manifest);
            let manifest_store = Arc::clone(&self.manifest_store);
            let fatal = Arc::clone(&fatal);
            let halted = Arc::clone(&halted);
            let options = self.options.clone();
            let ctx = self.ctx.clone();
            let on_chunk_progress = on_chunk_progress.clone();

            async move {
                // Halted or shutting down: leave the document untouched
                if halted.load(Ordering::SeqCst) || ctx.shutdown.is_requested() {
                    return None;
                }

                let path_str = path.display().to_string();

                // Settled by a prior run of this batch
                if !options.force_rerun {
                    let prior = manifest.lock().get(&path_str).cloned();
                    if let Some(outcome) = prior {
                        info!(
                            "Skipping {} (already {} in this batch)",
                            path_str,
                            match &outcome.status {
                                DocumentStatus::Succeeded => "succeeded",
                                DocumentStatus::Failed { .. } => "failed",
                                DocumentStatus::Skipped => "skipped",
                            }
                        );
                        return Some((index, outcome));
                    }
                }

                let output_path = resolve_output_path(&path, &options);

                // Completed before this batch: output artifact present and
                // no pending checkpoint
                let key = document_key(&path);
                if !options.force_overwrite
                    && FileManager::file_exists(&output_path)
                    && !chunk_store.exists(&key)
                {
                    info!(
                        "Skipping {} (translation already exists, use force to redo)",
                        path_str
                    );
                    let outcome = make_outcome(&path_str, DocumentStatus::Skipped, None, None);
                    record_and_flush(&manifest, &manifest_store, outcome.clone());
                    return Some((index, outcome));
                }

                let progress = {
                    let path = path.clone();
                    let on_chunk_progress = on_chunk_progress.clone();
                    move |done: usize, total: usize| on_chunk_progress(&path, done, total)
                };

                match pipeline.run(&path, &output_path, progress).await {
                    Ok(DocumentRunStatus::Succeeded { chunks_total }) => {
                        let outcome = make_outcome(
                            &path_str,
                            DocumentStatus::Succeeded,
                            Some(chunks_total),
                            Some(0),
                        );
                        record_and_flush(&manifest, &manifest_store, outcome.clone());
                        Some((index, outcome))
                    }
                    Ok(DocumentRunStatus::Failed {
                        error,
                        chunks_total,
                        chunks_failed,
                    }) => {
                        warn!("Document {} failed: {}", path_str, error);
                        let outcome = make_outcome(
                            &path_str,
                            DocumentStatus::Failed { error },
                            Some(chunks_total),
                            Some(chunks_failed),
                        );
                        record_and_flush(&manifest, &manifest_store, outcome.clone());
                        if !options.continue_on_error {
                            warn!("continue_on_error is off; halting the batch");
                            halted.store(true, Ordering::SeqCst);
                        }
                        Some((index, outcome))
                    }
                    Ok(DocumentRunStatus::Interrupted) => {
                        // Not settled; the next run resumes from the checkpoint
                        None
                    }
                    Err(fatal_error) => {
                        error!(
                            "Fatal provider error on {}: {}; aborting the batch",
                            path_str, fatal_error
                        );
                        halted.store(true, Ordering::SeqCst);
                        ctx.shutdown.request();
                        *fatal.lock() = Some(fatal_error);
                        None
                    }
                }
            }
        })
        .buffer_unordered(self.options.workers.max(1))
        .collect()
        .await;

        // Restore input order for reporting
        let mut settled: Vec<(usize, DocumentOutcome)> = results.into_iter().flatten().collect();
        settled.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<DocumentOutcome> = settled.into_iter().map(|(_, o)| o).collect();

        if let Some(fatal_error) = fatal.lock().take() {
            return Err(fatal_error);
        }

        let halted_early = halted.load(Ordering::SeqCst);
        let interrupted = self.ctx.shutdown.is_requested();

        let result = BatchResult {
            job_id,
            outcomes,
            halted_early,
            interrupted,
        };

        // A clean sweep retires the manifest unless history is kept
        if result.is_fully_successful()
            && result.outcomes.len() == total_documents
            && !self.options.retain_history
        {
            if let Err(e) = self.manifest_store.clear() {
                warn!("Failed to remove batch manifest: {}", e);
            }
        }

        Ok(result)
    }

    fn load_or_create_manifest(&self) -> Result<BatchManifest, TranslationError> {
        if self.options.force_rerun {
            if let Err(e) = self.manifest_store.clear() {
                warn!("Failed to discard prior batch manifest: {}", e);
            }
            return Ok(BatchManifest::new(self.options.continue_on_error));
        }

        match self.manifest_store.load() {
            Ok(Some(manifest)) => {
                info!(
                    "Resuming batch {} ({} documents already settled)",
                    manifest.job_id,
                    manifest.outcomes.len()
                );
                Ok(manifest)
            }
            Ok(None) => Ok(BatchManifest::new(self.options.continue_on_error)),
            Err(e) => {
                warn!("Could not load batch manifest ({}); starting fresh", e);
                Ok(BatchManifest::new(self.options.continue_on_error))
            }
        }
    }
}

/// Output path for a document under the batch options
fn resolve_output_path(input: &Path, options: &BatchOptions) -> PathBuf {
    let dir = options
        .output_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    FileManager::generate_output_path(input, dir, &options.target_language)
}

fn make_outcome(
    path: &str,
    status: DocumentStatus,
    chunks_total: Option<usize>,
    chunks_failed: Option<usize>,
) -> DocumentOutcome {
    DocumentOutcome {
        path: path.to_string(),
        status,
        chunks_total,
        chunks_failed,
        updated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Update the shared manifest and persist it atomically, under the lock so
/// concurrent workers never interleave partial writes
fn record_and_flush(
    manifest: &Arc<Mutex<BatchManifest>>,
    store: &Arc<BatchProgressStore>,
    outcome: DocumentOutcome,
) {
    let mut guard = manifest.lock();
    guard.record(outcome);
    if let Err(e) = store.save(&guard) {
        warn!("Failed to persist batch manifest: {}", e);
    }
}
