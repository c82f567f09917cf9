//! Metric definitions and metric identifiers reported by trainable models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::MetricsError;

/// Prefix used for the validation twin of a metric.
pub const VALIDATION_PREFIX: &str = "val_";

/// Whether a metric improves by going down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Min,
    Max,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Max
    }
}

impl Direction {
    /// Pick the extremum this direction considers best.
    pub fn select(self, min: f64, max: f64) -> f64 {
        match self {
            Direction::Min => min,
            Direction::Max => max,
        }
    }

    /// True when `candidate` beats `current` under this direction.
    pub fn is_better(self, candidate: f64, current: f64) -> bool {
        match self {
            Direction::Min => candidate < current,
            Direction::Max => candidate > current,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Min => "min",
            Direction::Max => "max",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "minimize" => Ok(Direction::Min),
            "max" | "maximize" => Ok(Direction::Max),
            other => Err(MetricsError::UnknownDirection {
                direction: other.to_string(),
            }),
        }
    }
}

/// A named scalar tracked during training.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    direction: Direction,
}

impl Metric {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Min)
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Max)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The `val_<name>` twin tracked when a validation set is present.
    pub fn validation_twin(&self) -> Metric {
        Metric::new(validation_name(&self.name), self.direction)
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        Metric::new(name, Direction::default())
    }
}

impl From<String> for Metric {
    fn from(name: String) -> Self {
        Metric::new(name, Direction::default())
    }
}

impl From<&MetricId> for Metric {
    fn from(id: &MetricId) -> Self {
        Metric::new(id.name(), Direction::default())
    }
}

/// Name of the validation twin for `name`.
pub fn validation_name(name: &str) -> String {
    format!("{VALIDATION_PREFIX}{name}")
}

/// A metric or loss object owned by a model (as opposed to a bare name).
pub trait NamedObject: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// JSON form of the object, `None` when it has no portable representation.
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }
}

/// How a model identifies one of its metrics or losses.
#[derive(Debug, Clone)]
pub enum MetricId {
    Named(String),
    Object(Arc<dyn NamedObject>),
}

impl MetricId {
    pub fn named(name: impl Into<String>) -> Self {
        MetricId::Named(name.into())
    }

    pub fn object(object: impl NamedObject + 'static) -> Self {
        MetricId::Object(Arc::new(object))
    }

    pub fn name(&self) -> &str {
        match self {
            MetricId::Named(name) => name,
            MetricId::Object(object) => object.name(),
        }
    }

    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            MetricId::Named(name) => Some(serde_json::Value::String(name.clone())),
            MetricId::Object(object) => object.to_json(),
        }
    }
}

impl From<&str> for MetricId {
    fn from(name: &str) -> Self {
        MetricId::Named(name.to_string())
    }
}

impl From<String> for MetricId {
    fn from(name: String) -> Self {
        MetricId::Named(name)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
