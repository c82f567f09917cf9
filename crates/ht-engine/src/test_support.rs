//! Scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ht_types::{MetricId, NamedObject, TrainingHistory, TunerError, TunerResult};
use parking_lot::Mutex;

use crate::display::Reporter;
use crate::model::{DeviceMemory, FitOptions, LossSpec, TrainableModel};

pub fn history(entries: &[(&str, &[f64])]) -> TrainingHistory {
    entries
        .iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}

#[derive(Debug)]
struct OpaqueLoss;

impl NamedObject for OpaqueLoss {
    fn name(&self) -> &str {
        "opaque_loss"
    }
}

/// Replays one scripted history per `fit` call, shared by all replicas.
#[derive(Debug)]
pub struct ScriptedModel {
    pub metrics: Vec<MetricId>,
    pub loss: Option<LossSpec>,
    script: Arc<Mutex<VecDeque<TunerResult<TrainingHistory>>>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedModel {
    pub fn new(histories: Vec<TrainingHistory>) -> Self {
        Self {
            metrics: vec![MetricId::named("accuracy")],
            loss: Some(LossSpec::from("mse")),
            script: Arc::new(Mutex::new(histories.into_iter().map(Ok).collect())),
            live: Arc::new(AtomicUsize::new(1)),
        }
    }

    pub fn failing(message: &str) -> Self {
        let model = Self::new(Vec::new());
        model
            .script
            .lock()
            .push_back(Err(TunerError::Training(message.to_string())));
        model
    }

    pub fn with_opaque_loss(mut self) -> Self {
        self.loss = Some(LossSpec::Single(MetricId::object(OpaqueLoss)));
        self
    }

    pub fn without_loss(mut self) -> Self {
        self.loss = None;
        self
    }

    /// Number of replicas (including this one) not yet dropped.
    pub fn live_replicas(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Clone for ScriptedModel {
    fn clone(&self) -> Self {
        self.live.fetch_add(1, Ordering::SeqCst);
        Self {
            metrics: self.metrics.clone(),
            loss: self.loss.clone(),
            script: Arc::clone(&self.script),
            live: Arc::clone(&self.live),
        }
    }
}

impl Drop for ScriptedModel {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TrainableModel for ScriptedModel {
    type Input = [f64];
    type Labels = [f64];

    fn metrics(&self) -> Vec<MetricId> {
        self.metrics.clone()
    }

    fn loss(&self) -> Option<LossSpec> {
        self.loss.clone()
    }

    fn loss_weights(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!([1.0]))
    }

    fn fit(
        &mut self,
        _x: &[f64],
        _y: Option<&[f64]>,
        _epochs: usize,
        _options: &FitOptions<'_, [f64], [f64]>,
    ) -> TunerResult<TrainingHistory> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TunerError::Training("script exhausted".to_string())))
    }

    fn summary(&self) -> String {
        "dense(64) -> dense(1)".to_string()
    }
}

/// Remembers everything it is asked to display.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, title: &str) {
        self.lines.lock().push(format!("section:{title}"));
    }

    fn subsection(&self, title: &str) {
        self.lines.lock().push(format!("subsection:{title}"));
    }

    fn text(&self, body: &str) {
        self.lines.lock().push(format!("text:{body}"));
    }

    fn fatal(&self, message: &str) {
        self.lines.lock().push(format!("fatal:{message}"));
    }
}

/// Counts reclaim calls and snapshots the live replica count at each one.
#[derive(Debug, Default)]
pub struct CountingDeviceMemory {
    pub reclaims: AtomicUsize,
    pub live_at_reclaim: Mutex<Vec<usize>>,
    pub live: Mutex<Option<Arc<AtomicUsize>>>,
}

impl CountingDeviceMemory {
    pub fn tracking(model: &ScriptedModel) -> Self {
        Self {
            live: Mutex::new(Some(Arc::clone(&model.live))),
            ..Self::default()
        }
    }

    pub fn reclaims(&self) -> usize {
        self.reclaims.load(Ordering::SeqCst)
    }
}

impl DeviceMemory for CountingDeviceMemory {
    fn reclaim(&self) {
        self.reclaims.fetch_add(1, Ordering::SeqCst);
        if let Some(live) = self.live.lock().as_ref() {
            self.live_at_reclaim.lock().push(live.load(Ordering::SeqCst));
        }
    }
}
