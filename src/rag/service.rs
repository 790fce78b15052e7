//! Retrieval and generation service.
//!
//! Owns the document store and the flat index behind one lock so the two can
//! never drift apart: index positions are the only key back into the chunk
//! list. Mutation happens only through the explicit rebuild path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::index::{FlatIndex, Snapshot};
use super::ingest::DocumentStore;
use crate::core::errors::RagError;
use crate::embedding::Embedder;
use crate::history::ConversationTurn;
use crate::llm::GenerativeModel;

/// Matches with squared L2 distance at or above this are discarded.
pub const DISTANCE_THRESHOLD: f32 = 2.0;
/// How many retrieved chunks go into the prompt.
pub const CONTEXT_TOP_K: usize = 2;
/// How many past turns the prompt transcript may carry.
pub const HISTORY_WINDOW: usize = 4;

/// Fixed user-facing reply when the pipeline fails; applied at the router
/// boundary, never inside the service.
pub const FALLBACK_RESPONSE: &str = "I apologize, but I'm having trouble processing your \
     request right now. Please try again or contact customer service for assistance.";

const NO_CONTEXT_PLACEHOLDER: &str = "No specific banking documents found for this query.";

/// A retrieved chunk with its distance to the query; nearer is better.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub text: String,
    pub distance: f32,
}

#[derive(Default)]
struct RagInner {
    store: DocumentStore,
    index: Option<FlatIndex>,
    embeddings: Vec<Vec<f32>>,
}

pub struct RagService {
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn GenerativeModel>,
    model_id: String,
    snapshot_dir: PathBuf,
    inner: RwLock<RagInner>,
}

impl RagService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn GenerativeModel>,
        model_id: String,
        snapshot_dir: PathBuf,
    ) -> Self {
        Self {
            embedder,
            model,
            model_id,
            snapshot_dir,
            inner: RwLock::new(RagInner::default()),
        }
    }

    /// Startup path: a usable snapshot short-circuits everything; otherwise
    /// ingest `docs_dir` and rebuild. Returns whether the service ended up
    /// ready to answer queries.
    pub async fn initialize(&self, docs_dir: &Path) -> Result<bool, RagError> {
        match self.load_snapshot().await {
            Ok(true) => {
                tracing::info!(
                    "Loaded saved index with {} documents",
                    self.document_count().await
                );
                return Ok(true);
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!("Snapshot rejected, forcing full rebuild: {}", err);
            }
        }

        let ingested = self.ingest_dir(docs_dir).await;
        if ingested == 0 {
            tracing::info!(
                "No documents found under {}; retrieval disabled",
                docs_dir.display()
            );
            return Ok(false);
        }

        let indexed = self.rebuild().await?;
        tracing::info!("Search index created with {} documents", indexed);
        Ok(true)
    }

    /// Loads the three snapshot artifacts if all are present. `Ok(false)`
    /// means no snapshot on disk; a corrupt snapshot is an error so the
    /// caller can fall through to a rebuild.
    async fn load_snapshot(&self) -> Result<bool, RagError> {
        let snapshot = Snapshot::new(&self.snapshot_dir);
        if !snapshot.exists() {
            return Ok(false);
        }

        let (index, chunks, embeddings) = snapshot.load()?;
        let mut inner = self.inner.write().await;
        inner.store = DocumentStore::from_chunks(chunks);
        inner.index = Some(index);
        inner.embeddings = embeddings;
        Ok(true)
    }

    pub async fn ingest_text(&self, text: &str, source: &str) -> usize {
        self.inner.write().await.store.ingest_text(text, source)
    }

    pub async fn ingest_dir(&self, dir: &Path) -> usize {
        self.inner.write().await.store.ingest_dir(dir)
    }

    /// Re-embeds every chunk and replaces the index wholesale, then persists
    /// the snapshot. Fails with `EmptyStore` when there is nothing to index;
    /// a snapshot write failure only logs, the in-memory index stays valid.
    pub async fn rebuild(&self) -> Result<usize, RagError> {
        let texts: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .store
                .chunks()
                .iter()
                .map(|chunk| chunk.text.clone())
                .collect()
        };

        if texts.is_empty() {
            return Err(RagError::EmptyStore);
        }

        let embeddings = self.embedder.embed(&texts).await?;
        let index = FlatIndex::from_rows(&embeddings)?;

        let mut inner = self.inner.write().await;
        inner.embeddings = embeddings;

        let snapshot = Snapshot::new(&self.snapshot_dir);
        if let Err(err) = snapshot.save(&index, inner.store.chunks(), &inner.embeddings) {
            tracing::warn!("Could not save index snapshot: {}", err);
        }
        inner.index = Some(index);

        Ok(inner.store.len())
    }

    /// Wholesale refresh: re-reads `docs_dir` into a fresh store and swaps it
    /// in together with the new index, so repeated calls never accumulate
    /// duplicate chunks. Nothing is replaced until the new index is ready; an
    /// empty directory or an embedding failure leaves the current state
    /// untouched.
    pub async fn reindex(&self, docs_dir: &Path) -> Result<usize, RagError> {
        let mut store = DocumentStore::new();
        store.ingest_dir(docs_dir);
        if store.is_empty() {
            return Err(RagError::EmptyStore);
        }

        let texts: Vec<String> = store
            .chunks()
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect();
        let embeddings = self.embedder.embed(&texts).await?;
        let index = FlatIndex::from_rows(&embeddings)?;

        let mut inner = self.inner.write().await;
        inner.store = store;
        inner.embeddings = embeddings;

        let snapshot = Snapshot::new(&self.snapshot_dir);
        if let Err(err) = snapshot.save(&index, inner.store.chunks(), &inner.embeddings) {
            tracing::warn!("Could not save index snapshot: {}", err);
        }
        inner.index = Some(index);

        Ok(inner.store.len())
    }

    /// k-nearest chunks under the acceptance threshold, nearest first. An
    /// uninitialized index yields an empty set, not an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, RagError> {
        let query_embedding = {
            let inner = self.inner.read().await;
            if inner.index.is_none() {
                tracing::debug!("Search requested before index build; returning no results");
                return Ok(Vec::new());
            }
            drop(inner);
            let mut rows = self.embedder.embed(&[query.to_string()]).await?;
            rows.pop()
                .ok_or_else(|| RagError::Retrieval("embedder returned no vector".to_string()))?
        };

        let inner = self.inner.read().await;
        let Some(index) = inner.index.as_ref() else {
            return Ok(Vec::new());
        };

        let hits = index.search(&query_embedding, k)?;
        let results = hits
            .into_iter()
            .filter(|(_, distance)| *distance < DISTANCE_THRESHOLD)
            .filter_map(|(pos, distance)| {
                inner.store.chunks().get(pos).map(|chunk| RetrievalResult {
                    text: chunk.text.clone(),
                    distance,
                })
            })
            .collect();
        Ok(results)
    }

    /// Builds the full prompt from retrieved context, the optional user
    /// context line, and the recent transcript, then asks the model. Typed
    /// errors propagate; mapping to the fallback reply is the router's job.
    pub async fn generate_response(
        &self,
        query: &str,
        user_context: &str,
        history: &[ConversationTurn],
    ) -> Result<String, RagError> {
        let results = self.search(query, CONTEXT_TOP_K).await?;
        let prompt = build_prompt(query, user_context, history, &results);

        tracing::debug!("Generating response with model {}", self.model_id);
        let response = self.model.generate(&self.model_id, &prompt).await?;
        Ok(response.trim().to_string())
    }

    pub async fn document_count(&self) -> usize {
        self.inner.read().await.store.len()
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.index.is_some()
    }
}

fn build_prompt(
    query: &str,
    user_context: &str,
    history: &[ConversationTurn],
    results: &[RetrievalResult],
) -> String {
    let context = if results.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        results
            .iter()
            .map(|result| result.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let mut prompt = format!(
        "You are a helpful and knowledgeable banking assistant. Use the provided banking \
         context to answer the user's question accurately and professionally.\n\n\
         Banking Context:\n{}\n",
        context
    );

    if !user_context.is_empty() {
        prompt.push_str(&format!("\nUser Context: {}\n", user_context));
    }

    let window = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    if !window.is_empty() {
        let transcript = window
            .iter()
            .map(|turn| format!("User: {}\nBot: {}", turn.user_message, turn.bot_response))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str(&format!("\nRecent Conversation History:\n{}\n", transcript));
    }

    prompt.push_str(&format!(
        "\nCurrent User Question: {}\n\n\
         Instructions:\n\
         - Provide a clear, helpful, and accurate response based on the banking context\n\
         - If the context doesn't contain relevant information, provide general banking \
         guidance if appropriate\n\
         - Keep responses concise but comprehensive\n\
         - Use a professional but friendly tone\n\
         - If you cannot answer based on available information, say so honestly\n\n\
         Response:",
        query
    ));

    prompt
}
