use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ht_types::{ResultsError, ResultsRecord, TunerResult};
use parking_lot::Mutex;

/// Sink for serialized result records.
pub trait ResultsStorage: Send + Sync + std::fmt::Debug {
    /// Verify that records can be written under `dir` before any work is
    /// done to produce them.
    fn check_dir(&self, _dir: &Path) -> TunerResult<()> {
        Ok(())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> TunerResult<()>;
}

/// Writes records to the local filesystem.
///
/// The target directory must already exist; a missing directory is a
/// configuration problem and is not papered over by creating it here.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    /// Load a persisted record back from disk.
    pub fn read_results<P: AsRef<Path>>(path: P) -> TunerResult<ResultsRecord> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ResultsError::InvalidRecord {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// All `*-results.json` files directly under `dir`, sorted by path.
    pub fn list_results<P: AsRef<Path>>(dir: P) -> TunerResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();

        if !dir.exists() {
            return Ok(paths);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("-results.json"));
            if path.is_file() && is_record {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

impl ResultsStorage for LocalStorage {
    fn check_dir(&self, dir: &Path) -> TunerResult<()> {
        if !dir.is_dir() {
            return Err(ResultsError::LocalDirNotFound {
                path: dir.display().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> TunerResult<()> {
        std::fs::write(path, bytes)?;
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Keeps written records in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl ResultsStorage for MemoryStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> TunerResult<()> {
        self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
