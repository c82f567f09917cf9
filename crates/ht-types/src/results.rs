//! Persisted results record and the statistics it carries.
//!
//! A [`ResultsRecord`] is the durable interchange format written once per
//! `record_results` call:
//!
//! ```text
//! {
//!   "idx": ..., "hyperparameters": {...}, ...      <- instance identity
//!   "executions": [ExecutionInfo, ...],
//!   "metrics": { name: { "min": Statistics, "max": Statistics } },
//!   "key_metrics": { name: median },
//!   "meta_data": MetaData
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::hyperparameters::Hyperparameters;
use crate::metric::Direction;
use crate::metrics::MetricConfig;

/// Marker written in place of a loss descriptor with no JSON form.
pub const CUSTOM_LOSS_MARKER: &str = "CUSTOM";

/// Per-epoch values keyed by metric name.
pub type TrainingHistory = BTreeMap<String, Vec<f64>>;

/// Persists non-finite epoch values as `null` and reads `null` back as NaN.
mod nullable_history {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    use super::TrainingHistory;

    pub fn serialize<S: Serializer>(
        history: &TrainingHistory,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<&str, Vec<Option<f64>>> = history
            .iter()
            .map(|(name, values)| {
                let values = values.iter().map(|v| v.is_finite().then_some(*v)).collect();
                (name.as_str(), values)
            })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<TrainingHistory, D::Error> {
        let encoded = BTreeMap::<String, Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|(name, values)| {
                let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, values)
            })
            .collect())
    }
}

/// Summary statistics over a set of per-execution values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Statistics {
    /// Compute statistics over `values`; `None` when there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
        })
    }
}

/// Cross-execution statistics for one metric: over the per-execution
/// minimums and, separately, over the per-execution maximums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    pub min: Statistics,
    pub max: Statistics,
}

impl MetricAggregate {
    pub fn bucket(&self, direction: Direction) -> &Statistics {
        match direction {
            Direction::Min => &self.min,
            Direction::Max => &self.max,
        }
    }
}

/// Stand-in for a loss descriptor that cannot be represented as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossFallback;

impl LossFallback {
    pub fn marker(self) -> serde_json::Value {
        serde_json::Value::String(CUSTOM_LOSS_MARKER.to_string())
    }
}

/// A metric promoted to the flat `key_metrics` summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub name: String,
    /// Which per-execution extremum bucket the median is read from.
    pub direction: Direction,
}

impl KeyMetric {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn defaults() -> Vec<KeyMetric> {
        vec![
            KeyMetric::new("loss", Direction::Min),
            KeyMetric::new("val_loss", Direction::Min),
            KeyMetric::new("accuracy", Direction::Max),
            KeyMetric::new("val_accuracy", Direction::Max),
        ]
    }
}

/// Where the results of an instance are written locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub local_dir: Option<PathBuf>,
}

/// Identifiers and free-form context attached to a results record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub project: String,
    pub architecture: String,
    pub instance: String,
    #[serde(default)]
    pub server: ServerInfo,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MetaData {
    pub fn new(
        project: impl Into<String>,
        architecture: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            architecture: architecture.into(),
            instance: instance.into(),
            server: ServerInfo::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.server.local_dir = Some(dir.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// `{project}-{architecture}-{instance}-results.json`
    pub fn results_file_name(&self) -> String {
        format!(
            "{}-{}-{}-results.json",
            self.project, self.architecture, self.instance
        )
    }
}

/// Context recorded alongside a single execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetaData {
    pub execution_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub epochs: usize,
    pub batch_size: usize,
    pub training_size: usize,
    pub validation_size: usize,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-execution entry of a results record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub num_epochs: usize,
    /// Non-finite values (diverged epochs) round-trip as NaN.
    #[serde(with = "nullable_history")]
    pub history: TrainingHistory,
    pub loss_fn: serde_json::Value,
    pub loss_weights: Option<serde_json::Value>,
    pub meta_data: ExecutionMetaData,
}

/// Identity of the instance a record belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub idx: String,
    pub hyperparameters: Hyperparameters,
    pub batch_size: usize,
    pub training_size: usize,
    pub validation_size: usize,
    pub execution_trained: usize,
    pub objective: Option<String>,
    pub metrics_config: Vec<MetricConfig>,
}

/// The durable, cross-process results record of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsRecord {
    #[serde(flatten)]
    pub instance: InstanceInfo,
    pub executions: Vec<ExecutionInfo>,
    pub metrics: BTreeMap<String, MetricAggregate>,
    pub key_metrics: BTreeMap<String, f64>,
    pub meta_data: MetaData,
}

impl ResultsRecord {
    /// Median of the objective metric, read from the bucket matching its
    /// direction. `None` when the schema has no objective or it was never
    /// observed.
    pub fn objective_score(&self) -> Option<(Direction, f64)> {
        let objective = self
            .instance
            .metrics_config
            .iter()
            .find(|entry| entry.is_objective)?;
        let aggregate = self.metrics.get(&objective.name)?;
        Some((
            objective.direction,
            aggregate.bucket(objective.direction).median,
        ))
    }
}
