//! Retrieval-augmented generation pipeline.
//!
//! - `ingest`: document chunking into the `DocumentStore`
//! - `index`: flat similarity index + on-disk snapshot
//! - `service`: retrieval, prompt assembly, and generation

pub mod index;
pub mod ingest;
pub mod service;

pub use service::{RagService, FALLBACK_RESPONSE};
