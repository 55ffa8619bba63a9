pub mod cache;
pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod providers;
pub mod traits;

pub use cache::{IndexCache, IndexEntry};
pub use chunking::{chunk_text, normalize_text};
pub use embeddings::{HashEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use engine::{build_context, QaEngine, QaOptions, NO_ANSWER};
pub use error::{IndexError, IngestError, ProviderError, QueryError};
pub use index::{FlatIndex, INDEX_FILE_NAME, META_FILE_NAME};
pub use ingest::{build_document_chunks, ingest, DocumentChunks, EMBED_BATCH_SIZE};
pub use loader::{discover_documents, read_document, DocumentFormat};
pub use models::{Chunk, IngestionOptions, IngestionStats, RetrievedChunk, SkippedFile};
pub use providers::{OllamaProvider, OpenAiProvider};
pub use traits::{ChatProvider, EmbeddingProvider};
