//! Document ingestion.
//!
//! Splits source documents into retrievable chunks:
//! - FAQ-style text (containing a question marker) splits on the marker
//! - everything else splits on paragraph boundaries
//! Segments of 50 characters or fewer are discarded.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// Chunks shorter than this are dropped during ingestion.
pub const MIN_CHUNK_CHARS: usize = 50;

const QUESTION_MARKERS: [&str; 2] = ["Q:", "Question:"];

/// A unit of retrievable text. Immutable once indexed; the index refers back
/// to chunks by position, so the store is append-only between rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
}

/// Ordered collection of chunks extracted from source documents.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Splits `text` into chunks and appends the survivors. Returns how many
    /// chunks were added.
    pub fn ingest_text(&mut self, text: &str, source: &str) -> usize {
        let segments = split_document(text);
        let added = segments.len();
        self.chunks
            .extend(segments.into_iter().map(|text| Chunk { text }));
        tracing::info!("Ingested {} chunks from {}", added, source);
        added
    }

    /// Ingests every `.txt`/`.md` file in `dir`. A file that cannot be read
    /// is logged and skipped; ingestion of the remaining files continues.
    pub fn ingest_dir(&mut self, dir: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Cannot read document dir {}: {}", dir.display(), err);
                return 0;
            }
        };

        let mut total = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_text = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
                .unwrap_or(false);
            if !is_text {
                continue;
            }

            match self.ingest_file(&path) {
                Ok(added) => total += added,
                Err(err) => tracing::warn!("{}", err),
            }
        }
        total
    }

    fn ingest_file(&mut self, path: &Path) -> Result<usize, RagError> {
        let source = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| RagError::Ingestion {
            path: source.clone(),
            cause: e.to_string(),
        })?;
        Ok(self.ingest_text(&text, &source))
    }
}

/// Splits a document into candidate chunks and applies the length floor.
fn split_document(text: &str) -> Vec<String> {
    let is_faq = QUESTION_MARKERS.iter().any(|marker| text.contains(marker));

    let raw: Vec<&str> = if is_faq {
        text.split("Q:").collect()
    } else {
        text.split("\n\n").collect()
    };

    raw.iter()
        .map(|segment| segment.trim())
        .filter(|segment| segment.chars().count() > MIN_CHUNK_CHARS)
        .map(|segment| segment.to_string())
        .collect()
}
