//! Per-instance state and the tuner-wide shared state.

use std::fmt::Write as _;
use std::sync::Arc;

use ht_types::{
    Hyperparameters, KeyMetric, MetaData, MetricConfig, MetricsCollection, TunerResult,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TunerConfig;

/// Lifecycle of an instance.
///
/// `Created -> SchemaReady -> Trained -> ResultsRecorded`; more fits after
/// recording move back to `Trained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Created,
    /// Schema built, no execution has completed yet.
    SchemaReady,
    Trained,
    ResultsRecorded,
}

/// Mutable state of one instance. Never shared across instances.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    pub idx: String,
    pub hyperparameters: Hyperparameters,
    pub batch_size: usize,
    pub training_size: usize,
    pub validation_size: usize,
    pub agg_metrics: Option<MetricsCollection>,
    pub execution_trained: usize,
    pub status: InstanceStatus,
}

impl InstanceState {
    pub fn new(idx: impl Into<String>, hyperparameters: Hyperparameters) -> Self {
        Self {
            idx: idx.into(),
            hyperparameters,
            batch_size: 0,
            training_size: 0,
            validation_size: 0,
            agg_metrics: None,
            execution_trained: 0,
            status: InstanceStatus::Created,
        }
    }

    /// Human-readable dump; `extended` adds hyperparameters and the schema.
    pub fn summary(&self, extended: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "instance: {}", self.idx);
        let _ = writeln!(out, "status: {:?}", self.status);
        let _ = writeln!(out, "executions trained: {}", self.execution_trained);
        let _ = writeln!(out, "batch size: {}", self.batch_size);
        let _ = writeln!(out, "training size: {}", self.training_size);
        let _ = writeln!(out, "validation size: {}", self.validation_size);

        if extended {
            let _ = writeln!(out, "hyperparameters:");
            for (name, value) in &self.hyperparameters {
                let _ = writeln!(out, "  {name}: {value}");
            }
            if let Some(metrics) = &self.agg_metrics {
                let _ = writeln!(out, "metrics:");
                for metric in metrics {
                    let marker = match metrics.objective() {
                        Some(objective) if objective.name() == metric.name() => " (objective)",
                        _ => "",
                    };
                    let _ = writeln!(out, "  {} [{}]{}", metric.name(), metric.direction(), marker);
                }
            }
        }
        out
    }
}

/// State shared by every instance of one search.
///
/// The tuner-level metric schema is adopted from whichever instance
/// initializes its schema first; later instances never replace it.
#[derive(Debug)]
pub struct TunerState {
    config: TunerConfig,
    agg_metrics: RwLock<Option<MetricsCollection>>,
}

impl TunerState {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            config,
            agg_metrics: RwLock::new(None),
        }
    }

    pub fn shared(config: TunerConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn objective(&self) -> &str {
        &self.config.objective
    }

    pub fn display_model(&self) -> bool {
        self.config.display_model
    }

    pub fn key_metrics(&self) -> &[KeyMetric] {
        &self.config.key_metrics
    }

    pub fn meta_data_for(&self, instance: impl Into<String>) -> MetaData {
        self.config.meta_data_for(instance)
    }

    /// Snapshot of the tuner-level schema, if one was adopted.
    pub fn agg_metrics(&self) -> Option<MetricsCollection> {
        self.agg_metrics.read().clone()
    }

    pub fn has_schema(&self) -> bool {
        self.agg_metrics.read().is_some()
    }

    /// Set the tuner-level schema unless one is already set.
    ///
    /// The collection is rebuilt from `config`, so the stored schema never
    /// aliases an instance's own collection. Returns `true` when this call
    /// adopted the schema.
    pub fn adopt_schema(&self, config: &[MetricConfig]) -> TunerResult<bool> {
        if self.has_schema() {
            return Ok(false);
        }

        let collection = MetricsCollection::from_config(config)?;
        let mut slot = self.agg_metrics.write();
        if slot.is_some() {
            debug!("Tuner schema adopted concurrently, keeping existing one");
            return Ok(false);
        }
        info!("Adopted tuner metric schema with {} metrics", collection.len());
        *slot = Some(collection);
        Ok(true)
    }
}
