use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::chunking::chunk_text;
use crate::error::IngestError;
use crate::index::{l2_normalize, FlatIndex, INDEX_FILE_NAME, META_FILE_NAME};
use crate::loader::{discover_documents, read_document};
use crate::models::{Chunk, IngestionOptions, IngestionStats, SkippedFile};
use crate::traits::EmbeddingProvider;

pub const EMBED_BATCH_SIZE: usize = 32;

pub struct DocumentChunks {
    pub chunks: Vec<Chunk>,
    pub files: usize,
    pub skipped: Vec<SkippedFile>,
}

// Per-file failures never abort the pass; they are collected into
// skipped. Whitespace-only files contribute nothing.
pub fn build_document_chunks(data_dir: &Path, options: &IngestionOptions) -> DocumentChunks {
    let mut chunks = Vec::new();
    let mut files = 0;
    let mut skipped = Vec::new();

    for path in discover_documents(data_dir) {
        let source = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        match read_document(&path) {
            Ok(content) => {
                if content.trim().is_empty() {
                    continue;
                }

                files += 1;
                for piece in chunk_text(&content, options.chunk_size, options.chunk_overlap) {
                    chunks.push(Chunk {
                        text: piece,
                        source: source.clone(),
                    });
                }
            }
            Err(error) => skipped.push(SkippedFile {
                path,
                reason: error.to_string(),
            }),
        }
    }

    DocumentChunks {
        chunks,
        files,
        skipped,
    }
}

// Nothing is written until every chunk embedded. The index file lands
// before the metadata file.
pub async fn ingest<E>(
    embedder: &E,
    data_dir: &Path,
    storage_dir: &Path,
    options: &IngestionOptions,
) -> Result<IngestionStats, IngestError>
where
    E: EmbeddingProvider + Sync + ?Sized,
{
    if options.chunk_overlap >= options.chunk_size {
        return Err(IngestError::InvalidChunkConfig(format!(
            "chunk_overlap {} must be smaller than chunk_size {}",
            options.chunk_overlap, options.chunk_size
        )));
    }

    let corpus = build_document_chunks(data_dir, options);
    if corpus.chunks.is_empty() {
        return Err(IngestError::NoDocuments {
            dir: data_dir.to_path_buf(),
        });
    }

    let texts: Vec<String> = corpus.chunks.iter().map(|chunk| chunk.text.clone()).collect();

    // Batches run sequentially and results stay in chunk order: array
    // position is the only identity tying a vector to its chunk.
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let mut batch_vectors = embedder.embed(batch, &options.embedding_model).await?;
        for vector in &mut batch_vectors {
            l2_normalize(vector);
        }
        vectors.extend(batch_vectors);
    }

    let index = FlatIndex::from_rows(&vectors)?;

    fs::create_dir_all(storage_dir)?;
    let index_path = storage_dir.join(INDEX_FILE_NAME);
    let meta_path = storage_dir.join(META_FILE_NAME);

    index.write_to(&index_path)?;
    let metadata = serde_json::to_string_pretty(&corpus.chunks)?;
    fs::write(&meta_path, metadata)?;

    Ok(IngestionStats {
        files: corpus.files,
        chunks: corpus.chunks.len(),
        dim: index.dim(),
        embedding_model: options.embedding_model.clone(),
        skipped: corpus.skipped,
        index_path,
        meta_path,
        ingested_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::{build_document_chunks, ingest};
    use crate::embeddings::HashEmbedder;
    use crate::error::IngestError;
    use crate::models::IngestionOptions;
    use std::fs;
    use tempfile::tempdir;

    fn options() -> IngestionOptions {
        IngestionOptions {
            chunk_size: 500,
            chunk_overlap: 50,
            embedding_model: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn two_text_files_produce_the_expected_stats() -> Result<(), Box<dyn std::error::Error>> {
        let data = tempdir()?;
        let storage = tempdir()?;

        let long: String = ('a'..='z').cycle().take(1200).collect();
        fs::write(data.path().join("a.txt"), &long)?;
        fs::write(data.path().join("b.txt"), "b".repeat(100))?;

        let embedder = HashEmbedder::default();
        let stats = ingest(&embedder, data.path(), storage.path(), &options()).await?;

        assert_eq!(stats.files, 2);
        assert_eq!(stats.chunks, 4);
        assert_eq!(stats.dim, embedder.dimensions);
        assert!(stats.skipped.is_empty());
        assert!(stats.index_path.exists());
        assert!(stats.meta_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn empty_dir_fails_with_no_documents() -> Result<(), Box<dyn std::error::Error>> {
        let data = tempdir()?;
        let storage = tempdir()?;

        let result = ingest(&HashEmbedder::default(), data.path(), storage.path(), &options()).await;
        assert!(matches!(result, Err(IngestError::NoDocuments { .. })));

        // Nothing may be persisted for a failed run.
        assert!(!storage.path().join("index.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn overlap_not_below_size_aborts_before_any_work() -> Result<(), Box<dyn std::error::Error>> {
        let data = tempdir()?;
        let storage = tempdir()?;
        fs::write(data.path().join("a.txt"), "some content")?;

        let bad = IngestionOptions {
            chunk_size: 100,
            chunk_overlap: 100,
            ..options()
        };
        let result = ingest(&HashEmbedder::default(), data.path(), storage.path(), &bad).await;
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        Ok(())
    }

    #[test]
    fn unreadable_files_are_skipped_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let data = tempdir()?;
        fs::write(data.path().join("broken.pdf"), b"%PDF-1.4\n%garbage")?;
        fs::write(data.path().join("fine.txt"), "readable content")?;

        let corpus = build_document_chunks(data.path(), &options());
        assert_eq!(corpus.files, 1);
        assert_eq!(corpus.chunks.len(), 1);
        assert_eq!(corpus.skipped.len(), 1);
        assert!(corpus.skipped[0].path.ends_with("broken.pdf"));
        Ok(())
    }

    #[test]
    fn whitespace_only_files_count_for_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let data = tempdir()?;
        fs::write(data.path().join("blank.txt"), "   \n\t\n")?;
        fs::write(data.path().join("real.md"), "actual words")?;

        let corpus = build_document_chunks(data.path(), &options());
        assert_eq!(corpus.files, 1);
        assert_eq!(corpus.chunks.len(), 1);
        assert!(corpus.skipped.is_empty());
        Ok(())
    }
}
