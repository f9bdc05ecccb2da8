//! Overlapping fixed-size chunking with boundary preference.
//!
//! A window of `size` characters slides over the text. Each window's end is
//! pulled back to the nearest paragraph, line, sentence or word boundary
//! found within the last quarter of the window; only when none exists is the
//! window hard-cut at `size`. The next window starts exactly `overlap`
//! characters before the previous end, so dropping the first `overlap`
//! characters of every chunk after the first and concatenating reproduces
//! the input.
//!
//! ```text
//! text:    "The quick brown fox jumps over"
//! chunk 0: "The quick brown "      cut after a space
//! chunk 1:         "own fox jumps over"   starts `overlap` chars earlier
//! ```

use tracing::debug;

use crate::config::ChunkingSettings;
use crate::error::ConfigError;
use crate::types::{Chunk, DocumentId};

/// Cut preferences, coarsest first.
const BOUNDARIES: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ConfigError> {
        ChunkingSettings { size, overlap }.validate()?;
        Ok(Self { size, overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self, ConfigError> {
        Self::new(settings.size, settings.overlap)
    }

    pub fn size(&self) -> usize { self.size }

    pub fn overlap(&self) -> usize { self.overlap }

    pub fn split(&self, text: &str, document: &DocumentId) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .ranges(text)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk { index, content: text[start..end].to_string(), start, end, document: document.clone() })
            .collect();
        debug!(chunks = chunks.len(), size = self.size, overlap = self.overlap, "split text");
        chunks
    }

    /// Byte ranges of every chunk.
    pub fn ranges(&self, text: &str) -> Vec<(usize, usize)> {
        if text.is_empty() { return vec![]; }
        // byte offset of each char, plus the end of the text
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let total = offsets.len() - 1;
        let mut ranges = Vec::new();
        let mut start = 0usize;
        loop {
            let hard_end = (start + self.size).min(total);
            if hard_end == total {
                ranges.push((offsets[start], offsets[total]));
                break;
            }
            let end = self.find_cut(text, &offsets, start, hard_end);
            ranges.push((offsets[start], offsets[end]));
            start = end - self.overlap;
        }
        ranges
    }

    /// Char index to end the window at; always in `start + overlap + 1 ..= hard_end`.
    fn find_cut(&self, text: &str, offsets: &[usize], start: usize, hard_end: usize) -> usize {
        let lookback = (self.size / 4).max(1);
        let floor = (start + self.overlap + 1).max(hard_end.saturating_sub(lookback));
        if floor >= hard_end { return hard_end; }
        let window = &text[offsets[floor]..offsets[hard_end]];
        for level in BOUNDARIES {
            let best = level.iter().filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len())).max();
            if let Some(cut) = best {
                if let Ok(idx) = offsets.binary_search(&(offsets[floor] + cut)) { return idx; }
            }
        }
        hard_end
    }
}

impl Default for Chunker {
    fn default() -> Self {
        let s = ChunkingSettings::default();
        Self { size: s.size, overlap: s.overlap }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DocumentId { DocumentId::from_bytes(b"test") }

    fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 { out.push_str(&c.content); } else { out.extend(c.content.chars().skip(overlap)); }
        }
        out
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(Chunker::new(10, 10).is_err());
        assert!(Chunker::new(10, 11).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn empty_text_gives_no_chunks() {
        assert!(Chunker::default().split("", &doc()).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let text = "Cats are mammals.\nDogs are mammals too.\nFish live in water.";
        let chunks = Chunker::default().split(text, &doc());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!((chunks[0].start, chunks[0].end), (0, text.len()));
    }

    #[test]
    fn prefers_word_boundaries_and_keeps_exact_overlap() {
        let text = "ant bee cat dog eel fox gnu hen owl pig rat yak ant bee cat dog elk";
        let chunker = Chunker::new(20, 4).unwrap();
        let chunks = chunker.split(text, &doc());
        assert!(chunks.len() > 2);
        for w in chunks.windows(2) {
            let prev: Vec<char> = w[0].content.chars().collect();
            let next: Vec<char> = w[1].content.chars().collect();
            assert_eq!(prev[prev.len() - 4..], next[..4]);
        }
        // every non-final chunk ends right after a space
        for c in &chunks[..chunks.len() - 1] { assert!(c.content.ends_with(' '), "{:?}", c.content); }
        assert_eq!(reassemble(&chunks, 4), text);
    }

    #[test]
    fn paragraph_break_beats_sentence_break() {
        let text = format!("{}\n\n{}. {}", "a".repeat(80), "b".repeat(12), "c".repeat(40));
        let chunks = Chunker::new(100, 10).unwrap().split(&text, &doc());
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn hard_cut_when_no_boundary() {
        let text = "x".repeat(50);
        let chunks = Chunker::new(20, 5).unwrap().split(&text, &doc());
        assert_eq!(chunks[0].content.len(), 20);
        assert_eq!(chunks[1].start, 15);
        assert_eq!(reassemble(&chunks, 5), text);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "ünïcödé wörds everywhere ünïcödé wörds everywhere ünïcödé";
        let chunks = Chunker::new(16, 3).unwrap().split(text, &doc());
        assert_eq!(reassemble(&chunks, 3), text);
        for c in &chunks { assert!(c.content.chars().count() <= 16); }
    }

    #[test]
    fn indices_are_sequential_and_reference_document() {
        let text = "word ".repeat(300);
        let chunks = Chunker::default().split(&text, &doc());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.document, doc());
            assert_eq!(&text[c.start..c.end], c.content);
        }
    }
}
