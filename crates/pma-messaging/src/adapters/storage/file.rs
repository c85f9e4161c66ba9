use crate::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed key-value store for durable single-node deployments.
///
/// The whole map is rewritten on every commit through a temp file and an
/// atomic rename. A batch is applied to a copy first and only becomes
/// visible once the file has been synced, so a failed write leaves both the
/// file and the in-memory view unchanged.
///
/// File format: repeated `[key_len:u32 le][key][value_len:u32 le][value]`.
#[derive(Debug)]
pub struct FileBackedKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Opens the store at `path`, loading existing contents if the file
    /// exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or is truncated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let data = Self::load_from_file(&path)?;
            info!(path = %path.display(), keys = data.len(), "Loaded ledger store");
            data
        } else {
            info!(path = %path.display(), "No existing ledger store, starting empty");
            BTreeMap::new()
        };

        Ok(Self { data, path })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, StoreError> {
        let mut file = std::fs::File::open(path).map_err(io_error)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(io_error)?;

        let mut data = BTreeMap::new();
        let mut cursor = 0;

        while cursor < bytes.len() {
            let key = read_chunk(&bytes, &mut cursor, path)?;
            let value = read_chunk(&bytes, &mut cursor, path)?;
            data.insert(key, value);
        }

        Ok(data)
    }

    fn save_to_file(&self, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut bytes = Vec::new();
        for (key, value) in data {
            write_chunk(&mut bytes, key)?;
            write_chunk(&mut bytes, value)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_error)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Ledger store synced");
        Ok(())
    }

    fn commit(&mut self, next: BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), StoreError> {
        self.save_to_file(&next)?;
        self.data = next;
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Io {
        message: e.to_string(),
    }
}

fn read_chunk(bytes: &[u8], cursor: &mut usize, path: &Path) -> Result<Vec<u8>, StoreError> {
    let corrupted = || StoreError::Corrupted {
        key: format!("{}@{}", path.display(), cursor),
    };

    let len_end = cursor.checked_add(4).ok_or_else(corrupted)?;
    let len_bytes: [u8; 4] = bytes
        .get(*cursor..len_end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(corrupted)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let end = len_end.checked_add(len).ok_or_else(corrupted)?;
    let chunk = bytes.get(len_end..end).ok_or_else(corrupted)?.to_vec();
    *cursor = end;
    Ok(chunk)
}

fn write_chunk(out: &mut Vec<u8>, chunk: &[u8]) -> Result<(), StoreError> {
    let len = u32::try_from(chunk.len()).map_err(|_| StoreError::Io {
        message: format!("chunk of {} bytes exceeds the file format limit", chunk.len()),
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(chunk);
    Ok(())
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.atomic_batch_write(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.atomic_batch_write(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut next = self.data.clone();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        self.commit(next)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let mut store = FileBackedKVStore::open(&path).unwrap();
            store
                .atomic_batch_write(vec![
                    BatchOperation::put(b"m:1".to_vec(), b"first".to_vec()),
                    BatchOperation::put(b"s:height".to_vec(), 7u64.to_be_bytes().to_vec()),
                ])
                .unwrap();
        }

        let store = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(store.get(b"m:1").unwrap(), Some(b"first".to_vec()));
        assert_eq!(
            store.get(b"s:height").unwrap(),
            Some(7u64.to_be_bytes().to_vec())
        );
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedKVStore::open(dir.path().join("nested/ledger.db")).unwrap();
        assert!(store.prefix_scan(b"").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        // Declares a 16-byte key but carries only 3 bytes.
        std::fs::write(&path, [16u8, 0, 0, 0, b'a', b'b', b'c']).unwrap();

        let err = FileBackedKVStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }

    #[test]
    fn test_failed_commit_leaves_view_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let mut store = FileBackedKVStore::open(&path).unwrap();
        store.put(b"p:alice", b"v1").unwrap();

        // A directory squatting on the temp path makes the next commit fail.
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        let err = store.put(b"p:alice", b"v2").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.get(b"p:alice").unwrap(), Some(b"v1".to_vec()));

        let reopened = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"p:alice").unwrap(), Some(b"v1".to_vec()));
    }
}
