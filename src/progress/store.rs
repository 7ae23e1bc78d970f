/*!
 * Durable progress stores.
 *
 * Checkpoints are versioned JSON snapshots, written whole to a temporary
 * file and renamed over the previous one — never mutated in place — so a
 * crash mid-write cannot leave a torn file that would be misread as valid on
 * resume. A checkpoint that fails to parse, or that no longer matches its
 * document, is quarantined to a `.corrupt` sidecar and treated as absent:
 * the document restarts from Pending instead of failing the batch.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::file_utils::FileManager;

use super::models::{BatchManifest, ProgressRecord};

/// File name of the batch-level manifest inside the state directory
const BATCH_MANIFEST_FILE: &str = "batch.json";

/// Default state directory under the platform's data dir
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("booktrans")
}

/// Per-document checkpoint store
pub struct ChunkProgressStore {
    dir: PathBuf,
}

impl ChunkProgressStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        FileManager::ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    /// The store's root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, document_key: &str) -> PathBuf {
        self.dir.join(format!("{}.progress.json", document_key))
    }

    /// Load the checkpoint for a document, if a usable one exists.
    ///
    /// Corrupt checkpoints are quarantined and reported as absent.
    pub fn load(&self, document_key: &str) -> Result<Option<ProgressRecord>> {
        let path = self.path_for(document_key);
        if !FileManager::file_exists(&path) {
            return Ok(None);
        }

        let content = FileManager::read_to_string(&path)?;
        match serde_json::from_str::<ProgressRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(parse_error) => {
                warn!(
                    "Checkpoint {} is corrupt ({}); discarding it and restarting the document",
                    path.display(),
                    parse_error
                );
                self.quarantine(&path);
                Ok(None)
            }
        }
    }

    /// Whether a checkpoint file exists for a document (without parsing it)
    pub fn exists(&self, document_key: &str) -> bool {
        FileManager::file_exists(self.path_for(document_key))
    }

    /// Atomically replace the checkpoint for a document
    pub fn save(&self, document_key: &str, record: &ProgressRecord) -> Result<()> {
        let path = self.path_for(document_key);
        let content = serde_json::to_string_pretty(record)
            .context("Failed to serialize progress record")?;
        FileManager::atomic_write(&path, &content)?;
        debug!(
            "Checkpoint saved: {} ({}/{} chunks done)",
            path.display(),
            record.done_count(),
            record.chunk_count
        );
        Ok(())
    }

    /// Remove the checkpoint for a document.
    ///
    /// Called only after the reassembled output has been durably written, so
    /// a completed translation never loses its checkpoint before the final
    /// artifact exists.
    pub fn clear(&self, document_key: &str) -> Result<()> {
        FileManager::remove_if_exists(self.path_for(document_key))
    }

    /// Move an unusable checkpoint aside for inspection instead of deleting
    /// evidence
    fn quarantine(&self, path: &Path) {
        let mut quarantined = path.as_os_str().to_owned();
        quarantined.push(".corrupt");
        if let Err(e) = std::fs::rename(path, PathBuf::from(&quarantined)) {
            warn!(
                "Failed to quarantine corrupt checkpoint {}: {}",
                path.display(),
                e
            );
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Batch-level manifest store
pub struct BatchProgressStore {
    path: PathBuf,
}

impl BatchProgressStore {
    /// Open a manifest store inside the state directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        FileManager::ensure_dir(&dir)?;
        Ok(Self {
            path: dir.join(BATCH_MANIFEST_FILE),
        })
    }

    /// The manifest file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest from a prior run, if a usable one exists
    pub fn load(&self) -> Result<Option<BatchManifest>> {
        if !FileManager::file_exists(&self.path) {
            return Ok(None);
        }

        let content = FileManager::read_to_string(&self.path)?;
        match serde_json::from_str::<BatchManifest>(&content) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(parse_error) => {
                warn!(
                    "Batch manifest {} is corrupt ({}); starting a fresh batch",
                    self.path.display(),
                    parse_error
                );
                let _ = std::fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    /// Atomically replace the manifest
    pub fn save(&self, manifest: &BatchManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest)
            .context("Failed to serialize batch manifest")?;
        FileManager::atomic_write(&self.path, &content)
    }

    /// Remove the manifest (after a fully successful batch)
    pub fn clear(&self) -> Result<()> {
        FileManager::remove_if_exists(&self.path)
    }
}
