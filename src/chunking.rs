use crate::document::SourceDocument;
use crate::error::{RagError, Result};
use std::collections::VecDeque;
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Split boundaries from coarsest to finest; the empty separator splits
/// between characters
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Chunk sizing, measured in characters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// File name of the document this chunk belongs to
    pub source_id: String,
    /// Page the chunk was cut from
    pub page_number: usize,
    /// Byte offset of this chunk in its page text
    pub start_position: usize,
}

/// Recursive boundary-seeking text splitter.
///
/// Text is cut at the coarsest separator it contains. Pieces that fit are
/// merged greedily into windows of at most `chunk_size` characters, each new
/// window re-using up to `chunk_overlap` characters of trailing pieces from
/// the previous one. Pieces that don't fit are split again with the finer
/// separators. Every range is a slice of the input, so chunks minus their
/// overlaps spell out the original text.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(RecursiveSplitter { config })
    }

    /// Split every page of a document, keeping page numbers
    pub fn split_document(&self, document: &SourceDocument) -> Vec<TextChunk> {
        document
            .pages
            .iter()
            .flat_map(|page| {
                self.split_ranges(&page.text)
                    .into_iter()
                    // Whitespace-only windows carry nothing worth embedding
                    .filter(move |range| !page.text[range.clone()].trim().is_empty())
                    .map(move |range| TextChunk {
                        text: page.text[range.clone()].to_string(),
                        source_id: document.source_id.clone(),
                        page_number: page.page_number,
                        start_position: range.start,
                    })
            })
            .collect()
    }

    /// Byte ranges of the chunks of `text`, in order
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut chunks = Vec::new();
        self.split_span(text, 0..text.len(), SEPARATORS, &mut chunks);
        chunks
    }

    fn split_span(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[&str],
        chunks: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[span.clone()];
        let split_at = separators
            .iter()
            .position(|sep| sep.is_empty() || slice.contains(*sep));
        let (separator, finer) = match split_at {
            Some(idx) => (separators[idx], &separators[idx + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let mut fitting = Vec::new();
        for piece in split_keeping_separator(slice, separator, span.start) {
            if char_len(text, &piece) <= self.config.chunk_size {
                fitting.push(piece);
            } else {
                self.merge(text, &fitting, chunks);
                fitting.clear();
                self.split_span(text, piece, finer, chunks);
            }
        }
        self.merge(text, &fitting, chunks);
    }

    /// Merge adjacent pieces into windows, carrying an overlap between windows
    fn merge(&self, text: &str, pieces: &[Range<usize>], chunks: &mut Vec<Range<usize>>) {
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut window: VecDeque<Range<usize>> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > chunk_size && !window.is_empty() {
                push_window(&window, chunks);

                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(text, &first),
                        None => break,
                    }
                }
            }

            window.push_back(piece.clone());
            total += len;
        }

        if !window.is_empty() {
            push_window(&window, chunks);
        }
    }
}

fn push_window(window: &VecDeque<Range<usize>>, chunks: &mut Vec<Range<usize>>) {
    if let (Some(first), Some(last)) = (window.front(), window.back()) {
        chunks.push(first.start..last.end);
    }
}

/// Split at `separator`, leaving it attached to the preceding piece.
/// Returned ranges are shifted by `offset`.
fn split_keeping_separator(slice: &str, separator: &str, offset: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(idx, c)| offset + idx..offset + idx + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;

    while let Some(pos) = slice[start..].find(separator) {
        let end = start + pos + separator.len();
        pieces.push(offset + start..offset + end);
        start = end;
    }

    if start < slice.len() {
        pieces.push(offset + start..offset + slice.len());
    }

    pieces
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

/// Remove NUL characters, which the passage table rejects.
/// Chunks left blank by the cleaning are dropped.
pub fn strip_null_chars(chunks: Vec<TextChunk>) -> Vec<TextChunk> {
    chunks
        .into_iter()
        .filter_map(|mut chunk| {
            if chunk.text.contains('\0') {
                chunk.text = chunk.text.replace('\0', "");
            }
            (!chunk.text.trim().is_empty()).then_some(chunk)
        })
        .collect()
}
