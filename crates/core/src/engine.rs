use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{IndexCache, IndexEntry};
use crate::error::{IngestError, ProviderError, QueryError};
use crate::index::{l2_normalize, INDEX_FILE_NAME, META_FILE_NAME};
use crate::ingest::ingest;
use crate::models::{IngestionOptions, IngestionStats, RetrievedChunk};
use crate::traits::{ChatProvider, EmbeddingProvider};

// Shown as the answer, with no sources, when retrieval comes back
// empty. Not an error.
pub const NO_ANSWER: &str = "No relevant information found in the documents.";

const MAX_CONTEXT_CHARS: usize = 800;
const MIN_TRUNCATED_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct QaOptions {
    pub storage_dir: PathBuf,
    pub embedding_model: String,
    pub chat_model: String,
    pub top_k: usize,
}

impl Default for QaOptions {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            embedding_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.2:1b".to_string(),
            top_k: 3,
        }
    }
}

pub struct QaEngine<E, C>
where
    E: EmbeddingProvider,
    C: ChatProvider,
{
    embedder: E,
    chat: C,
    cache: IndexCache,
    options: QaOptions,
}

impl<E, C> QaEngine<E, C>
where
    E: EmbeddingProvider + Sync,
    C: ChatProvider + Sync,
{
    pub fn new(embedder: E, chat: C, options: QaOptions) -> Self {
        Self {
            embedder,
            chat,
            cache: IndexCache::new(),
            options,
        }
    }

    pub fn options(&self) -> &QaOptions {
        &self.options
    }

    pub fn index_built(&self) -> bool {
        self.options.storage_dir.join(INDEX_FILE_NAME).exists()
            && self.options.storage_dir.join(META_FILE_NAME).exists()
    }

    // Full rebuild. The cache notices the new files by mtime on the
    // next query.
    pub async fn build_index(
        &self,
        data_dir: &std::path::Path,
        options: &IngestionOptions,
    ) -> Result<IngestionStats, IngestError> {
        ingest(&self.embedder, data_dir, &self.options.storage_dir, options).await
    }

    pub fn cached_index(&self) -> Result<Arc<IndexEntry>, QueryError> {
        self.cache.get_or_load(&self.options.storage_dir)
    }

    // Returns the min(top_k, chunk_count) most similar chunks, best
    // first. The caller must query with the same embedding model the
    // index was built with.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, QueryError> {
        let entry = self.cached_index()?;

        let k = self.options.top_k.min(entry.chunks.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .embedder
            .embed(&[question.to_string()], &self.options.embedding_model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Response {
                service: "embedding",
                details: "no vector returned for the query".to_string(),
            })?;
        l2_normalize(&mut query);

        let hits = entry.index.search(&query, k)?;

        // Rows outside the metadata range would misattribute sources;
        // drop them instead of trusting a desynced index.
        Ok(hits
            .into_iter()
            .filter(|(row, _)| *row < entry.chunks.len())
            .map(|(row, score)| RetrievedChunk {
                text: entry.chunks[row].text.clone(),
                source: entry.chunks[row].source.clone(),
                score,
            })
            .collect())
    }

    // Returns the answer together with the full retrieved list for
    // citation display.
    pub async fn answer(
        &self,
        question: &str,
    ) -> Result<(String, Vec<RetrievedChunk>), QueryError> {
        let retrieved = self.retrieve(question).await?;

        if retrieved.is_empty() {
            return Ok((NO_ANSWER.to_string(), retrieved));
        }

        let context = build_context(&retrieved, MAX_CONTEXT_CHARS);
        let answer = self
            .chat
            .complete(question, &context, &self.options.chat_model)
            .await?;

        Ok((answer, retrieved))
    }
}

// Greedy concatenation of "[source] text" blocks in rank order. The
// first block that overflows is still included, truncated with an
// ellipsis, when more than MIN_TRUNCATED_CHARS of budget remain.
pub fn build_context(chunks: &[RetrievedChunk], budget: usize) -> String {
    let mut parts = Vec::new();
    let mut total = 0usize;

    for chunk in chunks {
        let tagged = format!("[{}] {}", chunk.source, chunk.text);
        let tagged_len = tagged.chars().count();

        if total + tagged_len > budget {
            let remaining = budget - total;
            if remaining > MIN_TRUNCATED_CHARS {
                let clipped: String = tagged.chars().take(remaining).collect();
                parts.push(format!("{clipped}..."));
            }
            break;
        }

        total += tagged_len;
        parts.push(tagged);
    }

    parts.join("\n\n")
}
