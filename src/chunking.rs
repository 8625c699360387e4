//! Character-budget chunking for incoming documents.
//!
//! A document is first cut into contiguous base segments of at most
//! `chunk_size - chunk_overlap` characters. Cuts prefer paragraph breaks, then line breaks, then
//! sentence and word boundaries (UAX #29 via `unicode-segmentation`), and fall back to grapheme
//! clusters and finally single characters. Each chunk is its base segment prefixed with the
//! `chunk_overlap` characters of the document that precede it, so the window advances by
//! `chunk_size - chunk_overlap` and never exceeds `chunk_size`.

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The chunker was configured with an impossible budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new content in every chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
    /// Splitting produced no chunks for the supplied input.
    #[error("document produced no chunks")]
    EmptyInput,
}

/// Boundary kinds tried in order when a span exceeds the window.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
    Grapheme,
    Char,
}

const BOUNDARIES: [Boundary; 6] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
    Boundary::Grapheme,
    Boundary::Char,
];

impl Boundary {
    /// Contiguous pieces of `text`; concatenated they reproduce `text` exactly.
    fn pieces(self, text: &str) -> Vec<&str> {
        match self {
            Self::Paragraph => text.split_inclusive("\n\n").collect(),
            Self::Line => text.split_inclusive('\n').collect(),
            Self::Sentence => text.split_sentence_bounds().collect(),
            Self::Word => text.split_word_bounds().collect(),
            Self::Grapheme => text.graphemes(true).collect(),
            Self::Char => text
                .char_indices()
                .map(|(offset, c)| &text[offset..offset + c.len_utf8()])
                .collect(),
        }
    }
}

/// Splits documents into overlapping chunks of bounded character length.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Build a chunker, rejecting `chunk_size == 0` and `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters carried over from the previous chunk.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Characters of new content per chunk.
    fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Split `text` into ordered chunks.
    ///
    /// Every chunk holds at most `chunk_size` characters. Input without any non-whitespace
    /// content yields [`ChunkingError::EmptyInput`].
    pub fn split(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        if text.trim().is_empty() {
            return Err(ChunkingError::EmptyInput);
        }

        let mut chunks = Vec::new();
        let mut offset = 0;
        for segment in self.base_segments(text) {
            let start = offset;
            offset += segment.len();
            // Whitespace-only spans carry nothing to embed.
            if segment.trim().is_empty() {
                continue;
            }

            let overlap = char_tail(&text[..start], self.chunk_overlap);
            let mut chunk = String::with_capacity(overlap.len() + segment.len());
            chunk.push_str(overlap);
            chunk.push_str(segment);
            chunks.push(chunk);
        }

        if chunks.is_empty() {
            return Err(ChunkingError::EmptyInput);
        }

        tracing::debug!(
            chunk_size = self.chunk_size,
            overlap = self.chunk_overlap,
            chunks = chunks.len(),
            "Document split"
        );
        Ok(chunks)
    }

    /// Contiguous segments of at most `stride` characters that together reproduce `text`.
    fn base_segments<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut segments = Vec::new();
        pack_segments(text, self.stride(), 0, &mut segments);
        segments
    }
}

/// Greedily pack the pieces at `BOUNDARIES[depth]` into spans of at most `window` characters,
/// descending to finer boundaries for any piece that alone exceeds the window.
fn pack_segments<'a>(text: &'a str, window: usize, depth: usize, out: &mut Vec<&'a str>) {
    if count_chars(text) <= window {
        out.push(text);
        return;
    }
    let Some(boundary) = BOUNDARIES.get(depth) else {
        out.push(text);
        return;
    };

    let mut span_start = 0;
    let mut span_chars = 0;
    let mut cursor = 0;
    for piece in boundary.pieces(text) {
        let piece_chars = count_chars(piece);
        if piece_chars > window {
            if span_chars > 0 {
                out.push(&text[span_start..cursor]);
            }
            pack_segments(piece, window, depth + 1, out);
            cursor += piece.len();
            span_start = cursor;
            span_chars = 0;
            continue;
        }
        if span_chars + piece_chars > window {
            out.push(&text[span_start..cursor]);
            span_start = cursor;
            span_chars = 0;
        }
        span_chars += piece_chars;
        cursor += piece.len();
    }
    if span_chars > 0 {
        out.push(&text[span_start..cursor]);
    }
}

fn count_chars(segment: &str) -> usize {
    segment.chars().count()
}

/// Last `limit` characters of `text`, respecting UTF-8 boundaries.
fn char_tail(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    let start = text
        .char_indices()
        .rev()
        .nth(limit - 1)
        .map(|(offset, _)| offset)
        .unwrap_or(0);
    &text[start..]
}
