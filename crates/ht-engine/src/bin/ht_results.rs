use std::path::PathBuf;

use ht_data::LocalStorage;
use ht_engine::{rank_by_objective, TunerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| TunerConfig::default().apply_env().results_dir)
        .unwrap_or_else(ht_data::default_results_dir);

    let paths = LocalStorage::list_results(&dir)?;
    info!("Found {} result records in {}", paths.len(), dir.display());

    let mut records = Vec::with_capacity(paths.len());
    for path in &paths {
        match LocalStorage::read_results(path) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    for (rank, record) in rank_by_objective(records).iter().enumerate() {
        let score = match (record.instance.objective.as_deref(), record.objective_score()) {
            (Some(name), Some((direction, value))) => format!("{name}={value:.6} ({direction})"),
            _ => "no objective".to_string(),
        };
        let key_metrics = record
            .key_metrics
            .iter()
            .map(|(name, value)| format!("{name}={value:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{:>3}. {} [{} executions] {} {}",
            rank + 1,
            record.instance.idx,
            record.executions.len(),
            score,
            key_metrics
        );
    }

    Ok(())
}
