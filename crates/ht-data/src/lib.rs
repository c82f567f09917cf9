pub mod storage;
pub mod backend;

pub use storage::*;
pub use backend::*;

use std::path::PathBuf;

/// Default directory for local result records.
pub fn default_results_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hypertune")
        .join("results")
}
