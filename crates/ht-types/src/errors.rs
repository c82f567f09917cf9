use thiserror::Error;

/// Main error type for the HyperTune system
#[derive(Error, Debug)]
pub enum TunerError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl TunerError {
    /// Configuration errors abort the run and are never retried.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TunerError::Config(_)
                | TunerError::Metrics(MetricsError::ObjectiveNotFound { .. })
                | TunerError::Results(ResultsError::MissingMetaData)
                | TunerError::Results(ResultsError::MissingLocalDir)
                | TunerError::Results(ResultsError::LocalDirNotFound { .. })
        )
    }
}

/// Metric schema errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Duplicate metric: {name}")]
    Duplicate { name: String },

    #[error("Objective {name} is not part of the metric schema")]
    ObjectiveNotFound { name: String },

    #[error("Unknown metric direction: {direction}")]
    UnknownDirection { direction: String },

    #[error("Metric schema declares {count} objectives, expected at most one")]
    MultipleObjectives { count: usize },
}

/// Execution-related errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Duplicate execution id: {execution_id}")]
    DuplicateId { execution_id: String },

    #[error("Execution not found: {execution_id}")]
    NotFound { execution_id: String },

    #[error("Execution {execution_id} has no trained model")]
    ModelReleased { execution_id: String },
}

/// Result recording errors
#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Instance meta data is not set")]
    MissingMetaData,

    #[error("No local results directory configured")]
    MissingLocalDir,

    #[error("Local results directory does not exist: {path}")]
    LocalDirNotFound { path: String },

    #[error("Cannot record results before any execution has been trained")]
    NoExecutions,

    #[error("Failed to send results to backend: {message}")]
    BackendFailed { message: String },

    #[error("Invalid results record {path}: {message}")]
    InvalidRecord { path: String, message: String },
}

/// Result type alias for HyperTune operations
pub type TunerResult<T> = Result<T, TunerError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::TunerError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::TunerError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::TunerError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MetricsError::ObjectiveNotFound {
            name: "val_accuracy".to_string(),
        };

        assert!(error.to_string().contains("val_accuracy"));
        assert!(error.to_string().contains("not part of the metric schema"));
    }

    #[test]
    fn test_error_conversion() {
        let results_error = ResultsError::MissingMetaData;
        let tuner_error: TunerError = results_error.into();

        match tuner_error {
            TunerError::Results(_) => (),
            _ => panic!("Expected Results error"),
        }
        assert!(tuner_error.is_config());
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid split: {}", 1.5);
        let _internal_err = internal_error!("Something went wrong");
        let config_err = config_error!("Missing required field: {}", "project");

        assert!(!validation_err.is_config());
        assert!(config_err.is_config());
        assert!(config_err.to_string().contains("project"));
    }
}
