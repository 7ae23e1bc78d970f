/*!
 * Durable pipeline state: per-document checkpoints and the batch manifest.
 *
 * - `models`: the JSON schema of persisted state
 * - `store`: atomic load/save/clear on top of the filesystem
 */

pub mod models;
pub mod store;

pub use models::{
    BatchManifest, ChunkProgress, DocumentOutcome, DocumentStatus, ProgressRecord,
};
pub use store::{default_state_dir, BatchProgressStore, ChunkProgressStore};
