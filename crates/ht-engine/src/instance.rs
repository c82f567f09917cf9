//! One hyperparameter configuration under search: schema setup, executions,
//! and the results record.

use std::sync::Arc;

use ht_data::{LocalStorage, ResultsBackend, ResultsStorage};
use ht_types::{
    internal_error, Hyperparameters, InstanceInfo, MetaData, MetricConfig, ResultsError,
    ResultsRecord, TunerError, TunerResult,
};
use tracing::{debug, info};

use crate::aggregate::{project_key_metrics, MetricsAggregator};
use crate::display::{Reporter, TracingReporter};
use crate::execution::{Execution, ExecutionsCollection};
use crate::model::{DeviceMemory, FitOptions, NoopDeviceMemory, TrainableModel, TrainingInput};
use crate::schema::build_schema;
use crate::sizing::{DatasetSizes, DEFAULT_BATCH_SIZE};
use crate::state::{InstanceState, InstanceStatus, TunerState};

/// Owns a model configuration, its executions, and its results.
#[derive(Debug)]
pub struct Instance<M: TrainableModel> {
    model: M,
    tuner_state: Arc<TunerState>,
    state: InstanceState,
    executions: ExecutionsCollection<M>,
    metrics_config: Vec<MetricConfig>,
    meta_data: Option<MetaData>,
    storage: Arc<dyn ResultsStorage>,
    backend: Option<Arc<dyn ResultsBackend>>,
    device_memory: Arc<dyn DeviceMemory>,
    reporter: Arc<dyn Reporter>,
    results: Option<ResultsRecord>,
}

impl<M: TrainableModel> Instance<M> {
    pub fn new(
        idx: impl Into<String>,
        model: M,
        hyperparameters: Hyperparameters,
        tuner_state: Arc<TunerState>,
    ) -> Self {
        Self {
            model,
            tuner_state,
            state: InstanceState::new(idx, hyperparameters),
            executions: ExecutionsCollection::new(),
            metrics_config: Vec::new(),
            meta_data: None,
            storage: Arc::new(LocalStorage::new()),
            backend: None,
            device_memory: Arc::new(NoopDeviceMemory),
            reporter: Arc::new(TracingReporter),
            results: None,
        }
    }

    pub fn with_meta_data(mut self, meta_data: MetaData) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    /// Meta data derived from the tuner configuration for this instance.
    pub fn with_default_meta_data(mut self) -> Self {
        self.meta_data = Some(self.tuner_state.meta_data_for(self.state.idx.clone()));
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn ResultsStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ResultsBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_device_memory(mut self, device_memory: Arc<dyn DeviceMemory>) -> Self {
        self.device_memory = device_memory;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn idx(&self) -> &str {
        &self.state.idx
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn status(&self) -> InstanceStatus {
        self.state.status
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn executions(&self) -> &ExecutionsCollection<M> {
        &self.executions
    }

    /// Serialized schema handed to each execution; empty before the first fit.
    pub fn metrics_config(&self) -> &[MetricConfig] {
        &self.metrics_config
    }

    pub fn meta_data(&self) -> Option<&MetaData> {
        self.meta_data.as_ref()
    }

    /// The last record produced by [`Instance::record_results`].
    pub fn results(&self) -> Option<&ResultsRecord> {
        self.results.as_ref()
    }

    /// Print the instance state and return the printed text.
    pub fn summary(&self, extended: bool) -> String {
        let text = self.state.summary(extended);
        self.reporter.section("Instance summary");
        self.reporter.text(&text);
        text
    }

    /// Run one execution of this instance's model.
    pub fn fit(
        &mut self,
        x: &M::Input,
        y: Option<&M::Labels>,
        epochs: usize,
        options: &FitOptions<'_, M::Input, M::Labels>,
    ) -> TunerResult<&Execution<M>> {
        self.state.batch_size = options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

        let validation_labels = options
            .validation_data
            .map(|(_, labels)| labels.sample_count());
        let sizes = DatasetSizes::derive(
            x.extent(),
            self.state.batch_size,
            validation_labels,
            options.validation_split,
        )
        .map_err(|e| self.fail_fast(e))?;
        self.state.training_size = sizes.training;
        self.state.validation_size = sizes.validation;
        debug!(
            "Instance {}: training size {}, validation size {}",
            self.state.idx, sizes.training, sizes.validation
        );

        if self.state.status == InstanceStatus::Created {
            self.init_schema().map_err(|e| self.fail_fast(e))?;
        }

        if self.state.status == InstanceStatus::SchemaReady {
            self.announce();
        }

        let mut execution = Execution::new(
            self.model.clone(),
            &self.state,
            &self.tuner_state,
            &self.metrics_config,
        );
        execution.fit(x, y, epochs, options)?;
        self.executions.add(execution)?;
        self.state.execution_trained += 1;
        self.state.status = InstanceStatus::Trained;

        self.executions
            .last()
            .ok_or_else(|| internal_error!("execution missing right after it was added"))
    }

    fn init_schema(&mut self) -> TunerResult<()> {
        let loss = self.model.loss();
        let schema = build_schema(
            &self.model.metrics(),
            loss.as_ref(),
            self.state.validation_size > 0,
            self.tuner_state.objective(),
        )?;
        self.metrics_config = schema.to_config();
        info!(
            "Instance {}: metric schema [{}]",
            self.state.idx,
            schema.names().collect::<Vec<_>>().join(", ")
        );

        self.tuner_state.adopt_schema(&self.metrics_config)?;
        self.state.agg_metrics = Some(schema);
        self.state.status = InstanceStatus::SchemaReady;
        Ok(())
    }

    fn announce(&self) {
        self.reporter.section("Training new instance");
        self.reporter.text(&self.state.summary(false));
        if self.tuner_state.display_model() {
            self.reporter.subsection("Model summary");
            self.reporter.text(&self.model.summary());
        }
    }

    fn fail_fast(&self, err: TunerError) -> TunerError {
        if err.is_config() || matches!(err, TunerError::Validation(_)) {
            self.reporter.fatal(&err.to_string());
        }
        err
    }

    /// Aggregate every execution into a results record, persist it, and
    /// push it to the remote backend when one is configured.
    ///
    /// Each execution's model is released, and device memory reclaimed,
    /// as soon as its statistics have been extracted.
    pub fn record_results(&mut self) -> TunerResult<&ResultsRecord> {
        let meta_data = self
            .meta_data
            .clone()
            .ok_or(ResultsError::MissingMetaData)
            .map_err(|e| self.fail_fast(e.into()))?;
        let local_dir = meta_data
            .server
            .local_dir
            .clone()
            .ok_or(ResultsError::MissingLocalDir)
            .map_err(|e| self.fail_fast(e.into()))?;
        self.storage
            .check_dir(&local_dir)
            .map_err(|e| self.fail_fast(e))?;
        if self.executions.is_empty() {
            return Err(ResultsError::NoExecutions.into());
        }

        let mut aggregator = MetricsAggregator::new();
        let mut executions = Vec::with_capacity(self.executions.len());
        for execution in self.executions.iter_mut() {
            aggregator.observe(execution.metrics());
            executions.push(execution.info());

            if execution.release_model().is_some() {
                self.device_memory.reclaim();
                debug!("Released model of execution {}", execution.id());
            }
        }

        let metrics = aggregator.finish();
        let key_metrics = project_key_metrics(&metrics, self.tuner_state.key_metrics());
        let record = ResultsRecord {
            instance: self.instance_info(),
            executions,
            metrics,
            key_metrics,
            meta_data,
        };

        let path = local_dir.join(record.meta_data.results_file_name());
        let bytes = serde_json::to_vec(&record)?;
        self.storage.write(&path, &bytes)?;
        info!(
            "Recorded results of {} executions to {}",
            record.executions.len(),
            path.display()
        );

        self.state.status = InstanceStatus::ResultsRecorded;
        let record: &ResultsRecord = self.results.insert(record);

        if let Some(backend) = &self.backend {
            backend.send_results(record).map_err(|e| ResultsError::BackendFailed {
                message: format!("{}: {}", backend.name(), e),
            })?;
            info!("Sent results to {}", backend.name());
        }

        Ok(record)
    }

    fn instance_info(&self) -> InstanceInfo {
        InstanceInfo {
            idx: self.state.idx.clone(),
            hyperparameters: self.state.hyperparameters.clone(),
            batch_size: self.state.batch_size,
            training_size: self.state.training_size,
            validation_size: self.state.validation_size,
            execution_trained: self.state.execution_trained,
            objective: self
                .state
                .agg_metrics
                .as_ref()
                .and_then(|metrics| metrics.objective())
                .map(|metric| metric.name().to_string()),
            metrics_config: self.metrics_config.clone(),
        }
    }
}
