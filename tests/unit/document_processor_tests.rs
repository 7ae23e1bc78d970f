/*!
 * Tests for the document model and text splitter.
 *
 * The splitter's contract: ordered, non-overlapping chunks whose
 * concatenation reproduces the input exactly, every chunk within the size
 * limit, and a single empty chunk for empty input.
 */

use booktrans::app_config::SplitMode;
use booktrans::document_processor::{ChunkStatus, Document, TextSplitter};

fn splitter(max_chars: usize) -> TextSplitter {
    TextSplitter::new(max_chars, SplitMode::Paragraphs).unwrap()
}

fn assert_reconstructs(text: &str, max_chars: usize, mode: SplitMode) {
    let splitter = TextSplitter::new(max_chars, mode).unwrap();
    let chunks = splitter.split(text);

    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text, "concatenated chunks must reproduce the input");

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i, "indices must be dense and contiguous");
        assert!(
            chunk.char_len() <= max_chars,
            "chunk {} has {} chars, limit is {}",
            i,
            chunk.char_len(),
            max_chars
        );
        assert_eq!(chunk.status, ChunkStatus::Pending);
    }
}

#[test]
fn test_split_withEmptyInput_shouldProduceSingleEmptyChunk() {
    let chunks = splitter(1000).split("");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert!(chunks[0].text.is_empty());
    assert!(!chunks[0].oversized);
}

#[test]
fn test_split_withSmallText_shouldProduceOneChunk() {
    let text = "A single short paragraph.\n\nAnd another one.\n";
    let chunks = splitter(1000).split(text);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn test_split_withZeroMaxChars_shouldBeConstructionError() {
    assert!(TextSplitter::new(0, SplitMode::Paragraphs).is_err());
}

#[test]
fn test_split_withParagraphs_shouldRespectBoundaries() {
    // Three paragraphs of ~40 chars; limit fits two per chunk
    let text = "Aaaa bbbb cccc dddd eeee ffff gggg hhh.\n\n\
                Iiii jjjj kkkk llll mmmm nnnn oooo ppp.\n\n\
                Qqqq rrrr ssss tttt uuuu vvvv wwww xxx.\n";
    let splitter = splitter(90);
    let chunks = splitter.split(text);

    assert_eq!(chunks.len(), 2);
    // The first chunk ends on a paragraph boundary, separator attached
    assert!(chunks[0].text.ends_with(".\n\n"));
    assert_reconstructs(text, 90, SplitMode::Paragraphs);
}

#[test]
fn test_split_with25kDocumentAndMax12k_shouldProduceThreeBoundedChunks() {
    // 250 paragraphs of exactly 100 chars each (98 + blank-line separator)
    let paragraph = format!("{}\n\n", "p".repeat(98));
    let text = paragraph.repeat(250);
    assert_eq!(text.chars().count(), 25_000);

    let chunks = splitter(12_000).split(&text);

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 12_000);
    }
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text);
    assert_eq!(rebuilt.chars().count(), 25_000);
}

#[test]
fn test_split_withOversizedParagraph_shouldFallBackToSentences() {
    // One paragraph of 10 sentences, far over the limit
    let sentence = "This sentence has a fixed length of fifty chars ok. ";
    let text = sentence.repeat(10);
    let chunks = splitter(120).split(&text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 120);
        // Sentence-boundary splits are within limits and not flagged
        assert!(!chunk.oversized);
    }
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_split_withNoSentenceBoundary_shouldHardSplitAndFlagOversized() {
    let text = "a".repeat(300);
    let chunks = splitter(100).split(&text);

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert_eq!(chunk.char_len(), 100);
        assert!(chunk.oversized, "hard-split pieces must be flagged");
    }
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_split_withMultibyteText_shouldNeverSplitInsideCharacter() {
    // 250 three-byte characters with no sentence boundaries
    let text = "あ".repeat(250);
    let chunks = splitter(100).split(&text);

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 100);
    }
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn test_split_withSentenceMode_shouldReconstructExactly() {
    // Continuous prose without blank lines
    let text = "First sentence here. Second sentence follows! Third one asks? \
                Fourth statement ends. Fifth keeps going and going until done."
        .to_string();
    assert_reconstructs(&text, 60, SplitMode::Sentences);
}

#[test]
fn test_split_withVariousLimits_shouldAlwaysReconstruct() {
    let text = "Short one.\n\nA slightly longer paragraph with several words in it.\n\n\
                Third paragraph.\n\nAnd a fourth paragraph to close the document.\n";
    for max_chars in [10, 25, 40, 80, 200, 10_000] {
        assert_reconstructs(text, max_chars, SplitMode::Paragraphs);
    }
}

#[test]
fn test_trailingSeparator_shouldCaptureWhitespaceSuffix() {
    let chunks = splitter(30).split("First paragraph text.\n\nSecond.\n");
    assert_eq!(chunks[0].trailing_separator(), "\n\n");
    assert_eq!(chunks[1].trailing_separator(), "\n");
}

#[test]
fn test_reassemble_shouldPreserveParagraphBoundaries() {
    let text = "First paragraph text here ok.\n\nSecond paragraph text here.\n";
    let splitter = TextSplitter::new(35, SplitMode::Paragraphs).unwrap();
    let mut document = Document::from_text("/tmp/sample.txt", text.to_string(), &splitter);
    assert_eq!(document.chunks.len(), 2);

    for i in 0..document.chunks.len() {
        // Model output typically arrives without the trailing separator
        let translated = format!("[t] {}", document.chunks[i].text.trim_end());
        document.chunks[i].mark_done(translated);
    }

    let output = document.reassemble().unwrap();
    assert_eq!(
        output,
        "[t] First paragraph text here ok.\n\n[t] Second paragraph text here.\n"
    );
}

#[test]
fn test_reassemble_withUntranslatedChunk_shouldFail() {
    let splitter = splitter(1000);
    let document = Document::from_text("/tmp/sample.txt", "Some text.".to_string(), &splitter);
    assert!(document.reassemble().is_err());
}

#[test]
fn test_completedThrough_shouldTrackContiguousPrefix() {
    let splitter = TextSplitter::new(20, SplitMode::Paragraphs).unwrap();
    let text = "Para one text.\n\nPara two text.\n\nPara three.\n";
    let mut document = Document::from_text("/tmp/sample.txt", text.to_string(), &splitter);
    assert!(document.chunks.len() >= 3);

    assert_eq!(document.completed_through(), None);

    document.chunks[0].mark_done("one".to_string());
    assert_eq!(document.completed_through(), Some(0));

    // A gap stops the prefix even if a later chunk is done
    document.chunks[2].mark_done("three".to_string());
    assert_eq!(document.completed_through(), Some(0));

    document.chunks[1].mark_done("two".to_string());
    assert_eq!(document.completed_through(), Some(2));
}

#[test]
fn test_documentKey_shouldDifferForSameNameInDifferentDirs() {
    use booktrans::document_processor::document_key;
    use std::path::Path;

    let a = document_key(Path::new("/books/a/chapter.txt"));
    let b = document_key(Path::new("/books/b/chapter.txt"));
    assert_ne!(a, b);
    assert!(a.starts_with("chapter-"));
}
