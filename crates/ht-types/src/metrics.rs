//! Ordered metric schema shared between an instance and the tuner.

use serde::{Deserialize, Serialize};

use crate::errors::MetricsError;
use crate::metric::{Direction, Metric};

/// Serialized form of one schema entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    pub direction: Direction,
    #[serde(default)]
    pub is_objective: bool,
}

/// Name-keyed metrics in first-seen order.
///
/// Adding a name that is already present is rejected with
/// [`MetricsError::Duplicate`]; the collection is never silently rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MetricConfig>", into = "Vec<MetricConfig>")]
pub struct MetricsCollection {
    metrics: Vec<Metric>,
    objective: Option<usize>,
}

impl MetricsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric, or a bare name which is tracked as a `max` metric.
    pub fn add(&mut self, metric: impl Into<Metric>) -> Result<(), MetricsError> {
        let metric = metric.into();
        if self.contains(metric.name()) {
            return Err(MetricsError::Duplicate {
                name: metric.name().to_string(),
            });
        }
        self.metrics.push(metric);
        Ok(())
    }

    /// Mark `name` as the search objective, replacing any previous one.
    pub fn set_objective(&mut self, name: &str) -> Result<(), MetricsError> {
        let idx = self
            .position(name)
            .ok_or_else(|| MetricsError::ObjectiveNotFound {
                name: name.to_string(),
            })?;
        self.objective = Some(idx);
        Ok(())
    }

    pub fn objective(&self) -> Option<&Metric> {
        self.objective.map(|idx| &self.metrics[idx])
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.position(name).map(|idx| &self.metrics[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(Metric::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn to_config(&self) -> Vec<MetricConfig> {
        self.metrics
            .iter()
            .enumerate()
            .map(|(idx, metric)| MetricConfig {
                name: metric.name().to_string(),
                direction: metric.direction(),
                is_objective: self.objective == Some(idx),
            })
            .collect()
    }

    /// Rebuild a collection from its serialized schema.
    pub fn from_config(config: &[MetricConfig]) -> Result<Self, MetricsError> {
        let objectives = config.iter().filter(|entry| entry.is_objective).count();
        if objectives > 1 {
            return Err(MetricsError::MultipleObjectives { count: objectives });
        }

        let mut collection = Self::new();
        for entry in config {
            collection.add(Metric::new(entry.name.clone(), entry.direction))?;
            if entry.is_objective {
                collection.set_objective(&entry.name)?;
            }
        }
        Ok(collection)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.metrics.iter().position(|metric| metric.name() == name)
    }
}

impl TryFrom<Vec<MetricConfig>> for MetricsCollection {
    type Error = MetricsError;

    fn try_from(config: Vec<MetricConfig>) -> Result<Self, Self::Error> {
        Self::from_config(&config)
    }
}

impl From<MetricsCollection> for Vec<MetricConfig> {
    fn from(collection: MetricsCollection) -> Self {
        collection.to_config()
    }
}

impl<'a> IntoIterator for &'a MetricsCollection {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_collection() -> MetricsCollection {
        let mut collection = MetricsCollection::new();
        collection.add("accuracy").unwrap();
        collection.add("val_accuracy").unwrap();
        collection.add(Metric::minimize("loss")).unwrap();
        collection.add(Metric::minimize("val_loss")).unwrap();
        collection
    }

    #[test]
    fn preserves_insertion_order() {
        let collection = sample_collection();
        let names: Vec<&str> = collection.names().collect();
        assert_eq!(names, vec!["accuracy", "val_accuracy", "loss", "val_loss"]);
        assert_eq!(collection.get("loss").unwrap().direction(), Direction::Min);
        assert_eq!(collection.get("accuracy").unwrap().direction(), Direction::Max);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut collection = sample_collection();
        let err = collection.add(Metric::minimize("accuracy")).unwrap_err();
        assert!(matches!(err, MetricsError::Duplicate { ref name } if name == "accuracy"));
        assert_eq!(collection.len(), 4);
        assert_eq!(collection.get("accuracy").unwrap().direction(), Direction::Max);
    }

    #[test]
    fn objective_must_exist() {
        let mut collection = sample_collection();
        assert!(collection.set_objective("f1").is_err());
        assert!(collection.objective().is_none());

        collection.set_objective("val_loss").unwrap();
        assert_eq!(collection.objective().unwrap().name(), "val_loss");

        collection.set_objective("accuracy").unwrap();
        assert_eq!(collection.objective().unwrap().name(), "accuracy");
        assert_eq!(
            collection.to_config().iter().filter(|c| c.is_objective).count(),
            1
        );
    }

    #[test]
    fn config_round_trip() {
        let mut collection = sample_collection();
        collection.set_objective("val_accuracy").unwrap();

        let config = collection.to_config();
        let rebuilt = MetricsCollection::from_config(&config).unwrap();
        assert_eq!(rebuilt, collection);
        assert_eq!(rebuilt.objective().unwrap().name(), "val_accuracy");
    }

    #[test]
    fn serde_uses_schema_list() {
        let mut collection = sample_collection();
        collection.set_objective("loss").unwrap();

        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.is_array());
        assert_eq!(json[2]["name"], "loss");
        assert_eq!(json[2]["direction"], "min");
        assert_eq!(json[2]["is_objective"], true);

        let back: MetricsCollection = serde_json::from_value(json).unwrap();
        assert_eq!(back, collection);
    }

    #[test]
    fn rejects_multiple_objectives() {
        let config = vec![
            MetricConfig {
                name: "a".into(),
                direction: Direction::Max,
                is_objective: true,
            },
            MetricConfig {
                name: "b".into(),
                direction: Direction::Min,
                is_objective: true,
            },
        ];
        assert!(matches!(
            MetricsCollection::from_config(&config),
            Err(MetricsError::MultipleObjectives { count: 2 })
        ));
    }
}
