//! Collaborator interfaces for the model being tuned.
//!
//! The engine never performs a training step itself; it drives a
//! [`TrainableModel`] and reads back the per-epoch history it reports.

use ht_types::{LossFallback, MetricId, TrainingHistory, TunerResult};

/// How an input reports its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputExtent {
    /// Length is a sample count.
    Samples(usize),
    /// Length is a batch count (generator-style sequences).
    Batches(usize),
}

impl InputExtent {
    /// The raw length reported by the input.
    pub fn len(self) -> usize {
        match self {
            InputExtent::Samples(n) | InputExtent::Batches(n) => n,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Anything a model can be fitted on.
pub trait TrainingInput {
    fn extent(&self) -> InputExtent;

    /// Number of individual samples, whatever the extent unit.
    fn sample_count(&self) -> usize {
        self.extent().len()
    }
}

impl<T> TrainingInput for [T] {
    fn extent(&self) -> InputExtent {
        InputExtent::Samples(self.len())
    }
}

impl<T> TrainingInput for Vec<T> {
    fn extent(&self) -> InputExtent {
        InputExtent::Samples(self.len())
    }
}

/// A sequence of pre-built batches.
#[derive(Debug, Clone, PartialEq)]
pub struct Batches<T> {
    batches: Vec<Vec<T>>,
}

impl<T> Batches<T> {
    pub fn new(batches: Vec<Vec<T>>) -> Self {
        Self { batches }
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.batches.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl<T: Clone> Batches<T> {
    /// Chunk `samples` into batches of `batch_size` (the last one may be short).
    pub fn from_samples(samples: &[T], batch_size: usize) -> Self {
        let batches = samples
            .chunks(batch_size.max(1))
            .map(<[T]>::to_vec)
            .collect();
        Self { batches }
    }
}

impl<T> TrainingInput for Batches<T> {
    fn extent(&self) -> InputExtent {
        InputExtent::Batches(self.batches.len())
    }

    fn sample_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

/// Options forwarded to [`TrainableModel::fit`].
#[derive(Debug)]
pub struct FitOptions<'a, X: ?Sized, Y: ?Sized> {
    pub batch_size: Option<usize>,
    pub validation_data: Option<(&'a X, &'a Y)>,
    pub validation_split: Option<f64>,
}

impl<X: ?Sized, Y: ?Sized> Default for FitOptions<'_, X, Y> {
    fn default() -> Self {
        Self {
            batch_size: None,
            validation_data: None,
            validation_split: None,
        }
    }
}

impl<X: ?Sized, Y: ?Sized> Clone for FitOptions<'_, X, Y> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<X: ?Sized, Y: ?Sized> Copy for FitOptions<'_, X, Y> {}

impl<'a, X: ?Sized, Y: ?Sized> FitOptions<'a, X, Y> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_validation_data(mut self, inputs: &'a X, labels: &'a Y) -> Self {
        self.validation_data = Some((inputs, labels));
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = Some(split);
        self
    }
}

/// The losses a model is compiled with.
#[derive(Debug, Clone)]
pub enum LossSpec {
    /// A single loss, always reported under the name `loss`.
    Single(MetricId),
    /// Named losses, one per model output.
    Named(Vec<(String, MetricId)>),
    /// An unnamed list of losses, reported under their own names.
    List(Vec<MetricId>),
}

impl LossSpec {
    /// Metric names under which the losses show up in training history.
    pub fn metric_names(&self) -> Vec<String> {
        match self {
            LossSpec::Single(_) => vec!["loss".to_string()],
            LossSpec::Named(losses) => losses.iter().map(|(name, _)| name.clone()).collect(),
            LossSpec::List(losses) => losses.iter().map(|id| id.name().to_string()).collect(),
        }
    }

    /// JSON descriptor of the configured losses.
    ///
    /// Fails with [`LossFallback`] as soon as one loss has no JSON form.
    pub fn descriptor(&self) -> Result<serde_json::Value, LossFallback> {
        match self {
            LossSpec::Single(id) => id.to_json().ok_or(LossFallback),
            LossSpec::Named(losses) => losses
                .iter()
                .map(|(name, id)| {
                    id.to_json()
                        .map(|json| (name.clone(), json))
                        .ok_or(LossFallback)
                })
                .collect::<Result<serde_json::Map<_, _>, _>>()
                .map(serde_json::Value::Object),
            LossSpec::List(losses) => losses
                .iter()
                .map(|id| id.to_json().ok_or(LossFallback))
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
        }
    }
}

impl From<&str> for LossSpec {
    fn from(name: &str) -> Self {
        LossSpec::Single(MetricId::named(name))
    }
}

/// A model configuration that can be trained repeatedly.
///
/// Every execution trains its own clone, so `Clone` must produce an
/// untrained replica with the same configuration.
pub trait TrainableModel: Clone + Send {
    type Input: TrainingInput + ?Sized;
    type Labels: TrainingInput + ?Sized;

    /// Metrics the model is compiled with, in declaration order.
    fn metrics(&self) -> Vec<MetricId>;

    /// The configured loss(es); `None` when the model was never compiled.
    fn loss(&self) -> Option<LossSpec>;

    fn loss_weights(&self) -> Option<serde_json::Value> {
        None
    }

    /// Train for `epochs` epochs and return per-epoch metric values.
    fn fit(
        &mut self,
        x: &Self::Input,
        y: Option<&Self::Labels>,
        epochs: usize,
        options: &FitOptions<'_, Self::Input, Self::Labels>,
    ) -> TunerResult<TrainingHistory>;

    /// Human-readable architecture summary.
    fn summary(&self) -> String;
}

/// Releases accelerator memory held by dropped models.
pub trait DeviceMemory: Send + Sync + std::fmt::Debug {
    fn reclaim(&self);
}

/// For hosts without device-resident model state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDeviceMemory;

impl DeviceMemory for NoopDeviceMemory {
    fn reclaim(&self) {}
}
