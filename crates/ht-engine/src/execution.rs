//! A single training run of an instance, and the per-instance collection of runs.

use std::collections::BTreeMap;

use chrono::Utc;
use ht_types::{
    Direction, ExecutionError, ExecutionInfo, ExecutionMetaData, LossFallback, MetricConfig,
    TrainingHistory, TunerResult, VALIDATION_PREFIX,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{FitOptions, TrainableModel};
use crate::state::{InstanceState, TunerState};

/// Unique execution identifier.
pub type ExecutionId = Uuid;

/// Extrema and history of one metric over one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetric {
    pub min: f64,
    pub max: f64,
    pub history: Vec<f64>,
}

impl ExecutionMetric {
    /// `None` when no finite value was recorded.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (min, max) = finite.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })?;
        Some(Self {
            min,
            max,
            history: values.to_vec(),
        })
    }

    pub fn best(&self, direction: Direction) -> f64 {
        direction.select(self.min, self.max)
    }

    pub fn last(&self) -> Option<f64> {
        self.history.last().copied()
    }
}

/// One training run. Holds its model replica until results are recorded.
#[derive(Debug)]
pub struct Execution<M: TrainableModel> {
    idx: ExecutionId,
    model: Option<M>,
    metrics_config: Vec<MetricConfig>,
    metrics: BTreeMap<String, ExecutionMetric>,
    num_epochs: usize,
    history: TrainingHistory,
    loss_fn: Result<serde_json::Value, LossFallback>,
    loss_weights: Option<serde_json::Value>,
    meta_data: ExecutionMetaData,
    objective: String,
}

impl<M: TrainableModel> Execution<M> {
    pub fn new(
        model: M,
        state: &InstanceState,
        tuner_state: &TunerState,
        metrics_config: &[MetricConfig],
    ) -> Self {
        let idx = Uuid::new_v4();
        let loss_fn = match model.loss() {
            Some(loss) => loss.descriptor(),
            None => Ok(serde_json::Value::Null),
        };
        let loss_weights = model.loss_weights();

        Self {
            idx,
            model: Some(model),
            metrics_config: metrics_config.to_vec(),
            metrics: BTreeMap::new(),
            num_epochs: 0,
            history: TrainingHistory::new(),
            loss_fn,
            loss_weights,
            meta_data: ExecutionMetaData {
                execution_id: idx,
                started_at: Utc::now(),
                finished_at: None,
                duration_seconds: None,
                epochs: 0,
                batch_size: state.batch_size,
                training_size: state.training_size,
                validation_size: state.validation_size,
                extra: serde_json::Map::new(),
            },
            objective: tuner_state.objective().to_string(),
        }
    }

    /// Train the model replica and record per-metric extrema for every
    /// schema metric the history reports.
    pub fn fit(
        &mut self,
        x: &M::Input,
        y: Option<&M::Labels>,
        epochs: usize,
        options: &FitOptions<'_, M::Input, M::Labels>,
    ) -> TunerResult<()> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| ExecutionError::ModelReleased {
                execution_id: self.idx.to_string(),
            })?;

        info!("Starting execution {} ({} epochs)", self.idx, epochs);
        self.meta_data.started_at = Utc::now();
        self.meta_data.epochs = epochs;

        let history = model.fit(x, y, epochs, options)?;

        let finished_at = Utc::now();
        self.meta_data.finished_at = Some(finished_at);
        self.meta_data.duration_seconds =
            Some((finished_at - self.meta_data.started_at).num_milliseconds() as f64 / 1000.0);

        self.num_epochs = history.values().map(Vec::len).max().unwrap_or(0);
        self.metrics = self.extract_metrics(&history);
        self.history = history;

        match self.metrics.get(&self.objective) {
            Some(objective) => {
                let direction = self
                    .metrics_config
                    .iter()
                    .find(|entry| entry.name == self.objective)
                    .map(|entry| entry.direction)
                    .unwrap_or_default();
                info!(
                    "Execution {} finished: best {} = {}",
                    self.idx,
                    self.objective,
                    objective.best(direction)
                );
            }
            None => info!("Execution {} finished", self.idx),
        }
        Ok(())
    }

    fn extract_metrics(&self, history: &TrainingHistory) -> BTreeMap<String, ExecutionMetric> {
        let mut metrics = BTreeMap::new();
        for entry in &self.metrics_config {
            let recorded = history
                .get(&entry.name)
                .and_then(|values| ExecutionMetric::from_values(values));
            match recorded {
                Some(metric) => {
                    metrics.insert(entry.name.clone(), metric);
                }
                None if entry.name.starts_with(VALIDATION_PREFIX)
                    && self.meta_data.validation_size == 0 =>
                {
                    debug!("No validation values for {}", entry.name);
                }
                None => warn!(
                    "Execution {} reported no values for metric {}",
                    self.idx, entry.name
                ),
            }
        }
        metrics
    }

    pub fn id(&self) -> ExecutionId {
        self.idx
    }

    pub fn metrics(&self) -> &BTreeMap<String, ExecutionMetric> {
        &self.metrics
    }

    pub fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn loss_descriptor(&self) -> Result<&serde_json::Value, LossFallback> {
        self.loss_fn.as_ref().map_err(|fallback| *fallback)
    }

    pub fn loss_weights(&self) -> Option<&serde_json::Value> {
        self.loss_weights.as_ref()
    }

    pub fn meta_data(&self) -> &ExecutionMetaData {
        &self.meta_data
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Drop the trained model, returning it if it was still held.
    pub fn release_model(&mut self) -> Option<M> {
        self.model.take()
    }

    /// Entry for the results record.
    pub fn info(&self) -> ExecutionInfo {
        ExecutionInfo {
            num_epochs: self.num_epochs,
            history: self.history.clone(),
            loss_fn: self
                .loss_fn
                .clone()
                .unwrap_or_else(|fallback| fallback.marker()),
            loss_weights: self.loss_weights.clone(),
            meta_data: self.meta_data.clone(),
        }
    }
}

/// Executions of one instance, in the order they were trained.
#[derive(Debug)]
pub struct ExecutionsCollection<M: TrainableModel> {
    executions: Vec<Execution<M>>,
}

impl<M: TrainableModel> Default for ExecutionsCollection<M> {
    fn default() -> Self {
        Self {
            executions: Vec::new(),
        }
    }
}

impl<M: TrainableModel> ExecutionsCollection<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an execution keyed by its own id; ids must be unique.
    pub fn add(&mut self, execution: Execution<M>) -> TunerResult<()> {
        if self.get(&execution.id()).is_some() {
            return Err(ExecutionError::DuplicateId {
                execution_id: execution.id().to_string(),
            }
            .into());
        }
        self.executions.push(execution);
        Ok(())
    }

    pub fn get(&self, id: &ExecutionId) -> Option<&Execution<M>> {
        self.executions.iter().find(|execution| execution.id() == *id)
    }

    pub fn try_get(&self, id: &ExecutionId) -> TunerResult<&Execution<M>> {
        self.get(id).ok_or_else(|| {
            ExecutionError::NotFound {
                execution_id: id.to_string(),
            }
            .into()
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Execution<M>> {
        self.executions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Execution<M>> {
        self.executions.iter_mut()
    }

    pub fn last(&self) -> Option<&Execution<M>> {
        self.executions.last()
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
