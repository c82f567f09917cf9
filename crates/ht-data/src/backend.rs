//! Remote collectors that receive a copy of every results record.

use ht_types::{ResultsRecord, TunerResult};
use parking_lot::Mutex;

/// Optional remote destination for result records.
///
/// Local persistence always happens first; a backend only receives records
/// that have already been written through [`crate::ResultsStorage`].
pub trait ResultsBackend: Send + Sync + std::fmt::Debug {
    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;

    fn send_results(&self, record: &ResultsRecord) -> TunerResult<()>;
}

/// Collects records in process, for dashboards living in the same binary.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: Mutex<Vec<ResultsRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResultsRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ResultsBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn send_results(&self, record: &ResultsRecord) -> TunerResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
