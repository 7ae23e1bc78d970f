/*!
 * Document model and text splitting.
 *
 * A `Document` is an immutable source text plus the ordered list of `Chunk`s
 * produced by the `TextSplitter`. Splitting is pure text manipulation with a
 * hard guarantee: concatenating the chunks' source spans in index order
 * reproduces the input byte-for-byte, because every separator stays attached
 * to the text that precedes it. Reassembly of the translated document leans
 * on the same property to preserve paragraph boundaries for downstream
 * consumers (chapter-heading detection happens on the reassembled text).
 */

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::app_config::SplitMode;

/// Blank-line paragraph separator; greedy so a run of blank lines is a
/// single break and never becomes a whitespace-only paragraph of its own
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n(?:[ \t\r]*\n)+").expect("paragraph break pattern is valid")
});

/// How far back from the chunk-size boundary to look for a sentence end
/// before giving up and hard-splitting, in characters
const SENTENCE_LOOKBACK_CHARS: usize = 400;

/// Lifecycle of a chunk within one pipeline run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// Not yet attempted in this run
    Pending,
    /// Currently being translated
    Translating,
    /// Accepted: passed the validation gate
    Done,
    /// Attempt budget exhausted without an accepted result
    Failed,
}

/// One unit of translation work
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the document; dense and contiguous from 0
    pub index: usize,
    /// Original text span, separators included
    pub text: String,
    /// Produced by a forced character-boundary split inside an overlong
    /// paragraph; flagged for downstream logging
    pub oversized: bool,
    /// Current lifecycle state
    pub status: ChunkStatus,
    /// Accepted translation, present once status is Done
    pub translation: Option<String>,
    /// Last concrete error, present once status is Failed
    pub last_error: Option<String>,
    /// Attempts consumed in this run
    pub attempts: u32,
}

impl Chunk {
    /// Create a fresh pending chunk
    pub fn pending(index: usize, text: String, oversized: bool) -> Self {
        Self {
            index,
            text,
            oversized,
            status: ChunkStatus::Pending,
            translation: None,
            last_error: None,
            attempts: 0,
        }
    }

    /// Source length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the source span carries no translatable content
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The whitespace suffix of the source span. Re-attached verbatim on
    /// reassembly so paragraph boundaries survive translation.
    pub fn trailing_separator(&self) -> &str {
        let trimmed = self.text.trim_end();
        &self.text[trimmed.len()..]
    }

    /// Transition to Translating
    pub fn mark_translating(&mut self) {
        self.status = ChunkStatus::Translating;
    }

    /// Transition to Done with an accepted translation
    pub fn mark_done(&mut self, translation: String) {
        self.status = ChunkStatus::Done;
        self.translation = Some(translation);
        self.last_error = None;
    }

    /// Transition to Failed with the last concrete error
    pub fn mark_failed(&mut self, error: String) {
        self.status = ChunkStatus::Failed;
        self.last_error = Some(error);
    }
}

/// A source document and its chunk states for one pipeline run
#[derive(Debug, Clone)]
pub struct Document {
    /// Source file path; the document's identity
    pub path: PathBuf,
    /// Raw UTF-8 source text, immutable once split
    pub raw_text: String,
    /// SHA-256 of the raw text, used to invalidate stale checkpoints
    pub digest: String,
    /// Ordered chunks
    pub chunks: Vec<Chunk>,
}

impl Document {
    /// Split a source text into a document ready for translation
    pub fn from_text(path: impl Into<PathBuf>, raw_text: String, splitter: &TextSplitter) -> Self {
        let digest = text_digest(&raw_text);
        let chunks = splitter.split(&raw_text);
        Self {
            path: path.into(),
            raw_text,
            digest,
            chunks,
        }
    }

    /// Stable checkpoint key: file stem plus a short digest of the full
    /// path, so same-named files in different directories never collide
    pub fn key(&self) -> String {
        document_key(&self.path)
    }

    /// Short display name for logs and progress bars
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Index through which every chunk is Done, if any
    pub fn completed_through(&self) -> Option<usize> {
        let mut last = None;
        for chunk in &self.chunks {
            if chunk.status == ChunkStatus::Done {
                last = Some(chunk.index);
            } else {
                break;
            }
        }
        last
    }

    /// Whether every chunk has been accepted
    pub fn is_fully_done(&self) -> bool {
        self.chunks.iter().all(|c| c.status == ChunkStatus::Done)
    }

    /// Chunks that exhausted their attempt budget
    pub fn failed_chunks(&self) -> Vec<&Chunk> {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Failed)
            .collect()
    }

    /// Rebuild the translated document.
    ///
    /// Each chunk contributes its translation with trailing whitespace
    /// normalized away, followed by the chunk's original separator, so the
    /// output carries the source's paragraph structure verbatim.
    pub fn reassemble(&self) -> anyhow::Result<String> {
        let mut output = String::with_capacity(self.raw_text.len());

        for chunk in &self.chunks {
            let translation = chunk.translation.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "Cannot reassemble {}: chunk {} is not translated",
                    self.path.display(),
                    chunk.index
                )
            })?;
            output.push_str(translation.trim_end());
            output.push_str(chunk.trailing_separator());
        }

        Ok(output)
    }
}

/// SHA-256 hex digest of a text
pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checkpoint key for a document path
pub fn document_key(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    // Keep the key filesystem-safe
    let safe_stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}-{}", safe_stem, &digest[..12])
}

/// Partitions raw text into ordered, size-bounded chunks while respecting
/// paragraph (or sentence) boundaries
pub struct TextSplitter {
    max_chars: usize,
    mode: SplitMode,
}

impl TextSplitter {
    /// Create a splitter. A zero `max_chars` is a configuration error and is
    /// rejected here, before any document is split.
    pub fn new(max_chars: usize, mode: SplitMode) -> anyhow::Result<Self> {
        if max_chars == 0 {
            return Err(anyhow::anyhow!("Chunk size limit must be greater than zero"));
        }
        Ok(Self { max_chars, mode })
    }

    /// The configured chunk size limit in characters
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split text into ordered chunks.
    ///
    /// Guarantees: chunks are non-overlapping and in order, concatenating
    /// them reproduces the input exactly, every chunk is at most `max_chars`
    /// characters, and an empty input yields exactly one empty chunk so
    /// downstream logic can rely on a chunk count of at least 1.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![Chunk::pending(0, String::new(), false)];
        }

        let units = match self.mode {
            SplitMode::Paragraphs => paragraph_spans(text),
            SplitMode::Sentences => sentence_spans(text),
        };

        let mut parts: Vec<(String, bool)> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for span in units {
            let unit = &text[span];
            let unit_chars = unit.chars().count();

            // A single unit over the limit gets split internally; close the
            // running chunk first to keep ordering intact
            if unit_chars > self.max_chars {
                if !current.is_empty() {
                    parts.push((std::mem::take(&mut current), false));
                    current_chars = 0;
                }
                debug!(
                    "Unit of {} chars exceeds chunk limit {}, splitting inside it",
                    unit_chars, self.max_chars
                );
                parts.extend(self.split_oversized(unit));
                continue;
            }

            if current_chars + unit_chars > self.max_chars && !current.is_empty() {
                parts.push((std::mem::take(&mut current), false));
                current_chars = 0;
            }

            current.push_str(unit);
            current_chars += unit_chars;
        }

        if !current.is_empty() {
            parts.push((current, false));
        }

        let chunks: Vec<Chunk> = parts
            .into_iter()
            .enumerate()
            .map(|(index, (text, oversized))| Chunk::pending(index, text, oversized))
            .collect();

        // Verify that no text was lost during chunking
        let total_bytes: usize = chunks.iter().map(|c| c.text.len()).sum();
        if total_bytes != text.len() {
            error!(
                "CRITICAL ERROR: Lost text during chunking! Original: {} bytes, after chunking: {} bytes",
                text.len(),
                total_bytes
            );
        }

        for chunk in chunks.iter().filter(|c| c.oversized) {
            warn!(
                "Chunk {} was hard-split at a character boundary ({} chars)",
                chunk.index,
                chunk.char_len()
            );
        }

        chunks
    }

    /// Split a single overlong unit: prefer the nearest sentence end at or
    /// before the size boundary, fall back to an exact character boundary.
    /// Hard-cut pieces (and the piece that starts mid-sentence after one)
    /// are flagged oversized.
    fn split_oversized(&self, text: &str) -> Vec<(String, bool)> {
        let mut pieces = Vec::new();
        let mut rest = text;
        let mut prev_was_hard = false;

        while rest.chars().count() > self.max_chars {
            // Byte offset just past the last character that still fits
            let limit = rest
                .char_indices()
                .nth(self.max_chars)
                .map(|(byte, _)| byte)
                .unwrap_or(rest.len());
            let window = &rest[..limit];

            match sentence_cut(window) {
                Some(cut) => {
                    pieces.push((rest[..cut].to_string(), prev_was_hard));
                    prev_was_hard = false;
                    rest = &rest[cut..];
                }
                None => {
                    pieces.push((rest[..limit].to_string(), true));
                    prev_was_hard = true;
                    rest = &rest[limit..];
                }
            }
        }

        if !rest.is_empty() {
            pieces.push((rest.to_string(), prev_was_hard));
        }

        pieces
    }
}

/// Whether a character ends a sentence, covering both Western and CJK
/// punctuation
fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '…' | '．')
}

/// Closing quotes and brackets that belong to the sentence they close
fn is_closing_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '»' | '”' | '’' | '」' | '』' | '）' | ')')
}

/// Paragraph spans with separators attached to the preceding paragraph
fn paragraph_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0usize;

    for sep in PARAGRAPH_BREAK.find_iter(text) {
        spans.push(start..sep.end());
        start = sep.end();
    }

    if start < text.len() {
        spans.push(start..text.len());
    }

    spans
}

/// Sentence spans with trailing quotes and whitespace attached
fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if !is_sentence_end(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = iter.peek() {
            if is_closing_quote(next) || next.is_whitespace() {
                end = j + next.len_utf8();
                iter.next();
            } else {
                break;
            }
        }

        spans.push(start..end);
        start = end;
    }

    if start < text.len() {
        spans.push(start..text.len());
    }

    spans
}

/// Byte offset of the best cut inside a window that already fits the size
/// limit: just past the last sentence end (plus its closing quotes and
/// whitespace) within the lookback distance from the window's end
fn sentence_cut(window: &str) -> Option<usize> {
    let window_chars = window.chars().count();
    let earliest = window_chars.saturating_sub(SENTENCE_LOOKBACK_CHARS);

    let mut best: Option<usize> = None;
    for (position, (byte, c)) in window.char_indices().enumerate() {
        if position >= earliest && is_sentence_end(c) {
            best = Some(byte + c.len_utf8());
        }
    }

    let mut cut = best?;
    for c in window[cut..].chars() {
        if is_closing_quote(c) || c.is_whitespace() {
            cut += c.len_utf8();
        } else {
            break;
        }
    }

    // A cut at offset zero would make no progress
    (cut > 0).then_some(cut)
}
