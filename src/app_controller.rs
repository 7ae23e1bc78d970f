use anyhow::{anyhow, Result};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use crate::app_config::Config;
use crate::document_processor::TextSplitter;
use crate::file_utils::FileManager;
use crate::progress::{default_state_dir, BatchProgressStore, ChunkProgressStore, DocumentStatus};
use crate::providers::TranslationClient;
use crate::translation::{
    render_prompt, BatchController, BatchOptions, DocumentPipeline, DoublePassRefiner,
    MemoryAttemptLogger, OutputValidator, RequestSettings, RetryOrchestrator, RetryPolicy,
    RunContext, ShutdownFlag, TranslationService,
};

// @module: Application controller for document translation

/// File extensions treated as translatable documents
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Run context shared with every worker
    ctx: RunContext,
    // @field: Attempt log, kept for the cost summary
    attempt_log: Arc<MemoryAttemptLogger>,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let attempt_log = Arc::new(MemoryAttemptLogger::new());
        let ctx = RunContext::new(attempt_log.clone());

        Ok(Self {
            config,
            ctx,
            attempt_log,
        })
    }

    /// Check if the controller is properly initialized with configuration
    pub fn is_initialized(&self) -> bool {
        !self.config.source_language.is_empty() && !self.config.target_language.is_empty()
    }

    /// The flag the top-level caller flips on signal receipt. The pipeline
    /// checks it between chunks, flushes its checkpoint and exits cleanly.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.ctx.shutdown.clone()
    }

    /// Run the main workflow: translate a file, or every document under a
    /// directory, with checkpoint-based resume
    pub async fn run(
        &self,
        input_path: PathBuf,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
        force_rerun: bool,
    ) -> Result<()> {
        if !input_path.exists() {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        }

        let documents = self.collect_documents(&input_path)?;
        if documents.is_empty() {
            warn!("No translatable documents found under {:?}", input_path);
            return Ok(());
        }

        info!(
            "Translating {} document(s) from {} to {} via {}",
            documents.len(),
            self.config.source_language,
            self.config.target_language,
            self.config.translation.provider.display_name()
        );

        let batch = self.build_batch_controller(output_dir, force_overwrite, force_rerun)?;

        // One progress bar per document, created when its first chunk settles
        let multi = MultiProgress::new();
        let bars: Arc<Mutex<HashMap<PathBuf, ProgressBar>>> = Arc::new(Mutex::new(HashMap::new()));
        let on_progress = {
            let multi = multi.clone();
            let bars = bars.clone();
            move |path: &Path, done: usize, total: usize| {
                let mut bars = bars.lock();
                let bar = bars.entry(path.to_path_buf()).or_insert_with(|| {
                    let bar = multi.add(ProgressBar::new(total as u64));
                    let style = ProgressStyle::with_template(
                        "{msg:25!} [{bar:40.cyan/blue}] {pos}/{len} chunks",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                    bar.set_style(style.progress_chars("=> "));
                    bar.set_message(
                        path.file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    );
                    bar
                });
                bar.set_length(total as u64);
                bar.set_position(done as u64);
                if done >= total {
                    bar.finish();
                }
            }
        };

        let result = batch.run(documents, on_progress).await;

        // Leave finished bars on screen, then report
        for bar in bars.lock().values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }

        match result {
            Ok(batch_result) => {
                info!("{}", self.attempt_log.summary());
                self.report_summary(&batch_result)
            }
            Err(fatal) => {
                error!("Batch aborted: {}", fatal);
                Err(fatal.into())
            }
        }
    }

    /// Gather the documents for this run
    fn collect_documents(&self, input_path: &Path) -> Result<Vec<PathBuf>> {
        if input_path.is_file() {
            return Ok(vec![input_path.to_path_buf()]);
        }

        let target_suffix = format!(".{}", self.config.target_language);
        let documents = FileManager::find_documents(input_path, DOCUMENT_EXTENSIONS)?
            .into_iter()
            .filter(|path| {
                // Outputs of this tool are named <stem>.<target>.<ext>;
                // don't feed them back in as inputs
                path.file_stem()
                    .map(|stem| !stem.to_string_lossy().ends_with(&target_suffix))
                    .unwrap_or(true)
            })
            .collect();

        Ok(documents)
    }

    /// Wire config into the pipeline and batch controller
    fn build_batch_controller(
        &self,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
        force_rerun: bool,
    ) -> Result<BatchController> {
        let translation = &self.config.translation;
        let common = &translation.common;
        let model = translation.get_model();

        let service = TranslationService::new(translation.clone())?;
        let client: Arc<dyn TranslationClient> = Arc::new(service);

        let splitter = TextSplitter::new(
            translation.get_max_chars_per_request(),
            self.config.pipeline.split_mode,
        )?;

        let validator = OutputValidator::new(
            self.config.validation.clone(),
            &self.config.source_language,
            &self.config.target_language,
        );

        let settings = RequestSettings {
            system_prompt: render_prompt(
                &common.system_prompt,
                &self.config.source_language,
                &self.config.target_language,
            ),
            temperature: common.temperature,
            max_tokens: TranslationService::max_tokens_for_model(&model),
        };

        let orchestrator = RetryOrchestrator::new(
            client.clone(),
            validator.clone(),
            RetryPolicy::from_config(common),
            settings,
            self.ctx.clone(),
        );

        let refiner = if self.config.pipeline.double_pass {
            let refine_settings = RequestSettings {
                system_prompt: render_prompt(
                    &common.refine_system_prompt,
                    &self.config.source_language,
                    &self.config.target_language,
                ),
                temperature: common.temperature,
                max_tokens: TranslationService::max_tokens_for_model(&model),
            };
            Some(DoublePassRefiner::new(
                client.clone(),
                validator,
                refine_settings,
                self.ctx.clone(),
            ))
        } else {
            None
        };

        let state_dir = self
            .config
            .pipeline
            .state_dir
            .clone()
            .unwrap_or_else(default_state_dir);
        let chunk_store = Arc::new(ChunkProgressStore::new(&state_dir)?);
        let manifest_store = Arc::new(BatchProgressStore::new(&state_dir)?);

        let pipeline = Arc::new(DocumentPipeline::new(
            splitter,
            self.config.pipeline.split_mode,
            orchestrator,
            refiner,
            chunk_store.clone(),
            self.ctx.clone(),
        ));

        let options = BatchOptions {
            force_overwrite,
            force_rerun,
            continue_on_error: self.config.pipeline.continue_on_error,
            retain_history: self.config.pipeline.retain_batch_history,
            workers: self.config.pipeline.effective_workers(),
            target_language: self.config.target_language.clone(),
            output_dir,
        };

        Ok(BatchController::new(
            pipeline,
            chunk_store,
            manifest_store,
            options,
            self.ctx.clone(),
        ))
    }

    /// Print the per-document outcome list; every failed document is named
    /// with its concrete cause
    fn report_summary(&self, result: &crate::translation::BatchResult) -> Result<()> {
        let mut succeeded = 0usize;
        let mut skipped = 0usize;

        for outcome in &result.outcomes {
            match &outcome.status {
                DocumentStatus::Succeeded => {
                    succeeded += 1;
                    info!("  ok      {}", outcome.path);
                }
                DocumentStatus::Skipped => {
                    skipped += 1;
                    info!("  skipped {}", outcome.path);
                }
                DocumentStatus::Failed { error } => {
                    error!("  FAILED  {} ({})", outcome.path, error);
                }
            }
        }

        let failures = result.failures();
        info!(
            "Batch {}: {} succeeded, {} skipped, {} failed",
            result.job_id,
            succeeded,
            skipped,
            failures.len()
        );

        if result.interrupted {
            warn!("Run was interrupted; re-run the same command to resume");
            return Ok(());
        }

        if !failures.is_empty() {
            if result.halted_early {
                warn!("Batch halted early; later documents were left untouched");
            }
            return Err(anyhow!(
                "{} document(s) failed to translate; re-run to retry them",
                failures.len()
            ));
        }

        Ok(())
    }
}
