// HyperTune instance/execution lifecycle engine

pub mod aggregate;
pub mod config;
pub mod display;
pub mod execution;
pub mod instance;
pub mod model;
pub mod schema;
pub mod sizing;
pub mod state;

#[cfg(test)]
mod test_support;

pub use aggregate::{project_key_metrics, rank_by_objective, MetricsAggregator};
pub use config::TunerConfig;
pub use display::{Reporter, TracingReporter};
pub use execution::{Execution, ExecutionId, ExecutionMetric, ExecutionsCollection};
pub use instance::Instance;
pub use model::{
    Batches, DeviceMemory, FitOptions, InputExtent, LossSpec, NoopDeviceMemory, TrainableModel,
    TrainingInput,
};
pub use schema::build_schema;
pub use sizing::{DatasetSizes, BATCH_COUNT_CORRECTION, DEFAULT_BATCH_SIZE};
pub use state::{InstanceState, InstanceStatus, TunerState};
