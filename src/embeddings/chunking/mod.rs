
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text
    pub content: String,
    /// The index of this chunk within the document
    pub chunk_index: usize,
}

/// Configuration for text chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Number of characters shared between adjacent chunks
    pub chunk_overlap: usize,
    /// Separator the text is split on before packing into chunks
    pub separator: String,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            separator: "\n".to_string(),
        }
    }
}

/// Split text into overlapping chunks.
///
/// The text is split on the configured separator, empty segments are
/// dropped, and segments are greedily packed into chunks of at most
/// `chunk_size` characters. Each chunk is seeded with the trailing
/// segments of its predecessor totalling at most `chunk_overlap`
/// characters, so chunk boundaries never fall inside a segment. A single
/// segment longer than `chunk_size` becomes its own oversized chunk.
///
/// Deterministic for identical input and configuration.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let sep = config.separator.as_str();
    let sep_len = sep.len();

    let mut contents: Vec<String> = Vec::new();
    // Segments currently packed into the pending chunk, with their joined length.
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut window_len = 0usize;

    for segment in text.split(sep).map(str::trim).filter(|s| !s.is_empty()) {
        if segment.len() > config.chunk_size {
            warn!(
                "Segment of {} characters exceeds chunk size {}, emitting as its own chunk",
                segment.len(),
                config.chunk_size
            );
        }

        let added = if window.is_empty() {
            segment.len()
        } else {
            segment.len() + sep_len
        };

        if window_len + added > config.chunk_size && !window.is_empty() {
            contents.push(join_segments(&window, sep));

            // Keep trailing segments within the overlap budget for the next chunk.
            while window_len > config.chunk_overlap {
                let Some(front) = window.pop_front() else {
                    break;
                };
                window_len -= front.len();
                if !window.is_empty() {
                    window_len -= sep_len;
                }
            }
        }

        if !window.is_empty() {
            window_len += sep_len;
        }
        window.push_back(segment);
        window_len += segment.len();

        // The overlap seed plus a large segment can overshoot; drop seed
        // segments until the chunk fits or only the new segment remains.
        while window_len > config.chunk_size && window.len() > 1 {
            let Some(front) = window.pop_front() else {
                break;
            };
            window_len -= front.len() + sep_len;
        }
    }

    if !window.is_empty() {
        contents.push(join_segments(&window, sep));
    }

    debug!("Chunked {} characters into {} chunks", text.len(), contents.len());

    contents
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| TextChunk {
            content,
            chunk_index,
        })
        .collect()
}

fn join_segments(segments: &VecDeque<&str>, separator: &str) -> String {
    let mut joined = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            joined.push_str(separator);
        }
        joined.push_str(segment);
    }
    joined
}
