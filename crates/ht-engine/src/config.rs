//! Tuner-level configuration.

use std::path::{Path, PathBuf};

use ht_types::{config_error, Direction, KeyMetric, MetaData, TunerResult};
use serde::{Deserialize, Serialize};

pub const RESULTS_DIR_ENV: &str = "HYPERTUNE_RESULTS_DIR";
pub const PROJECT_ENV: &str = "HYPERTUNE_PROJECT";
pub const OBJECTIVE_ENV: &str = "HYPERTUNE_OBJECTIVE";

/// Settings shared by every instance of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub project: String,
    pub architecture: String,

    /// Metric name the search optimizes (e.g. "val_loss", "val_accuracy").
    pub objective: String,

    /// Print the model summary before the first execution of an instance.
    pub display_model: bool,

    /// Metrics copied to the flat `key_metrics` summary of each record.
    pub key_metrics: Vec<KeyMetric>,

    /// Local directory for result records. `None` means unset.
    pub results_dir: Option<PathBuf>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            project: "default".to_string(),
            architecture: "default".to_string(),
            objective: "loss".to_string(),
            display_model: false,
            key_metrics: KeyMetric::defaults(),
            results_dir: None,
        }
    }
}

impl TunerConfig {
    pub fn new(project: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            architecture: architecture.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TunerResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            config_error!("cannot read tuner config {}: {}", path.display(), e)
        })?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `HYPERTUNE_*` environment variables.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(RESULTS_DIR_ENV) {
            self.results_dir = Some(PathBuf::from(dir));
        }
        if let Some(project) = lookup(PROJECT_ENV) {
            self.project = project;
        }
        if let Some(objective) = lookup(OBJECTIVE_ENV) {
            self.objective = objective;
        }
        self
    }

    pub fn validate(&self) -> TunerResult<()> {
        if self.objective.trim().is_empty() {
            return Err(config_error!("objective must not be empty"));
        }
        if self.project.trim().is_empty() || self.architecture.trim().is_empty() {
            return Err(config_error!("project and architecture must not be empty"));
        }
        Ok(())
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    pub fn with_display_model(mut self, display: bool) -> Self {
        self.display_model = display;
        self
    }

    pub fn with_key_metrics(mut self, key_metrics: Vec<KeyMetric>) -> Self {
        self.key_metrics = key_metrics;
        self
    }

    pub fn with_key_metric(mut self, name: impl Into<String>, direction: Direction) -> Self {
        self.key_metrics.push(KeyMetric::new(name, direction));
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// Meta data for the instance identified by `instance`.
    pub fn meta_data_for(&self, instance: impl Into<String>) -> MetaData {
        let mut meta = MetaData::new(self.project.clone(), self.architecture.clone(), instance);
        meta.server.local_dir = self.results_dir.clone();
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builder_and_meta_data() {
        let config = TunerConfig::new("mnist", "cnn")
            .with_objective("val_accuracy")
            .with_display_model(true)
            .with_key_metrics(vec![])
            .with_key_metric("val_accuracy", Direction::Max)
            .with_results_dir("/tmp/hypertune");

        assert_eq!(config.key_metrics.len(), 1);
        let meta = config.meta_data_for("i-7");
        assert_eq!(meta.results_file_name(), "mnist-cnn-i-7-results.json");
        assert_eq!(
            meta.server.local_dir.as_deref(),
            Some(Path::new("/tmp/hypertune"))
        );
    }

    #[test]
    fn json_file_with_partial_fields() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("tuner.json");
        std::fs::write(
            &path,
            r#"{"project": "cifar", "objective": "val_loss", "key_metrics": [{"name": "val_loss", "direction": "min"}]}"#,
        )
        .unwrap();

        let config = TunerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.project, "cifar");
        assert_eq!(config.architecture, "default");
        assert_eq!(config.objective, "val_loss");
        assert_eq!(config.key_metrics, vec![KeyMetric::new("val_loss", Direction::Min)]);
        assert!(config.results_dir.is_none());
    }

    #[test]
    fn overrides_from_environment_names() {
        let vars: std::collections::HashMap<&str, &str> = [
            (RESULTS_DIR_ENV, "/srv/results"),
            (PROJECT_ENV, "imagenet"),
            (OBJECTIVE_ENV, "val_accuracy"),
        ]
        .into_iter()
        .collect();

        let config = TunerConfig::new("mnist", "cnn")
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.project, "imagenet");
        assert_eq!(config.architecture, "cnn");
        assert_eq!(config.objective, "val_accuracy");
        assert_eq!(config.results_dir.as_deref(), Some(Path::new("/srv/results")));

        let untouched = TunerConfig::new("mnist", "cnn").apply_overrides(|_| None);
        assert_eq!(untouched, TunerConfig::new("mnist", "cnn"));
    }

    #[test]
    fn apply_env_reads_process_environment() {
        std::env::set_var(PROJECT_ENV, "from-env");
        let config = TunerConfig::new("mnist", "cnn").apply_env();
        std::env::remove_var(PROJECT_ENV);
        assert_eq!(config.project, "from-env");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("tuner.json");
        std::fs::write(&path, r#"{"objective": "  "}"#).unwrap();

        let err = TunerConfig::from_json_file(&path).unwrap_err();
        assert!(err.is_config());

        let missing = TunerConfig::from_json_file(temp_dir.path().join("absent.json"));
        assert!(missing.unwrap_err().is_config());
    }
}
