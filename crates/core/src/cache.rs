use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::QueryError;
use crate::index::{FlatIndex, INDEX_FILE_NAME, META_FILE_NAME};
use crate::models::Chunk;

// Staleness is keyed on the two files' modification times. A rebuild
// rewrites both and so changes the key.
type Fingerprint = (SystemTime, SystemTime);

pub struct IndexEntry {
    pub index: FlatIndex,
    pub chunks: Vec<Chunk>,
}

struct Slot {
    fingerprint: Fingerprint,
    entry: Arc<IndexEntry>,
}

// Single slot: installing a new entry evicts whatever was there.
#[derive(Default)]
pub struct IndexCache {
    slot: Mutex<Option<Slot>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The whole check-load-install runs under the lock so concurrent
    // callers cannot duplicate loads.
    pub fn get_or_load(&self, storage_dir: &Path) -> Result<Arc<IndexEntry>, QueryError> {
        let index_path = storage_dir.join(INDEX_FILE_NAME);
        let meta_path = storage_dir.join(META_FILE_NAME);

        // "Never built" is a distinct, user-actionable condition.
        if !index_path.exists() || !meta_path.exists() {
            return Err(QueryError::IndexNotFound {
                dir: storage_dir.to_path_buf(),
            });
        }

        let fingerprint = (
            fs::metadata(&index_path)?.modified()?,
            fs::metadata(&meta_path)?.modified()?,
        );

        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = slot.as_ref() {
            if existing.fingerprint == fingerprint {
                return Ok(Arc::clone(&existing.entry));
            }
        }

        let index = FlatIndex::read_from(&index_path)?;
        let raw = fs::read_to_string(&meta_path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&raw)?;

        if index.len() != chunks.len() {
            return Err(QueryError::CorruptIndex {
                details: format!(
                    "index holds {} rows but metadata holds {} chunks",
                    index.len(),
                    chunks.len()
                ),
            });
        }

        let entry = Arc::new(IndexEntry { index, chunks });
        *slot = Some(Slot {
            fingerprint,
            entry: Arc::clone(&entry),
        });

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::IndexCache;
    use crate::error::QueryError;
    use crate::index::{FlatIndex, INDEX_FILE_NAME, META_FILE_NAME};
    use crate::models::Chunk;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn write_storage(dir: &Path, rows: &[Vec<f32>], sources: &[&str]) {
        let index = FlatIndex::from_rows(rows).expect("uniform rows");
        index.write_to(&dir.join(INDEX_FILE_NAME)).expect("write index");

        let chunks: Vec<Chunk> = sources
            .iter()
            .map(|source| Chunk {
                text: format!("text from {source}"),
                source: source.to_string(),
            })
            .collect();
        fs::write(
            dir.join(META_FILE_NAME),
            serde_json::to_string_pretty(&chunks).expect("serializable"),
        )
        .expect("write metadata");
    }

    fn bump_mtimes(dir: &Path) {
        let later = SystemTime::now() + Duration::from_secs(5);
        for name in [INDEX_FILE_NAME, META_FILE_NAME] {
            fs::File::options()
                .write(true)
                .open(dir.join(name))
                .expect("open storage file")
                .set_modified(later)
                .expect("set mtime");
        }
    }

    #[test]
    fn missing_files_report_index_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let cache = IndexCache::new();

        let result = cache.get_or_load(dir.path());
        assert!(matches!(result, Err(QueryError::IndexNotFound { .. })));
        Ok(())
    }

    #[test]
    fn repeated_loads_between_writes_share_one_entry() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        write_storage(dir.path(), &[vec![1.0, 0.0]], &["a.txt"]);

        let cache = IndexCache::new();
        let first = cache.get_or_load(dir.path())?;
        let second = cache.get_or_load(dir.path())?;

        assert!(Arc::ptr_eq(&first, &second));
        Ok(())
    }

    #[test]
    fn changed_mtime_forces_a_fresh_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        write_storage(dir.path(), &[vec![1.0, 0.0]], &["a.txt"]);

        let cache = IndexCache::new();
        let stale = cache.get_or_load(dir.path())?;

        write_storage(dir.path(), &[vec![0.0, 1.0], vec![1.0, 0.0]], &["a.txt", "b.txt"]);
        bump_mtimes(dir.path());

        let fresh = cache.get_or_load(dir.path())?;
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(fresh.chunks.len(), 2);
        assert_eq!(fresh.index.len(), 2);
        Ok(())
    }

    #[test]
    fn row_count_mismatch_is_a_corrupt_index() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        write_storage(dir.path(), &[vec![1.0, 0.0], vec![0.0, 1.0]], &["only-one.txt"]);

        let cache = IndexCache::new();
        let result = cache.get_or_load(dir.path());
        assert!(matches!(result, Err(QueryError::CorruptIndex { .. })));
        Ok(())
    }
}
