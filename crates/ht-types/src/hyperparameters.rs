//! Hyperparameter values attached to an instance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A concrete hyperparameter value proposed by the search driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Hyperparameters keyed by name, ordered for stable output.
pub type Hyperparameters = BTreeMap<String, ParameterValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_serialization() {
        let mut hparams = Hyperparameters::new();
        hparams.insert("lr".into(), 0.001.into());
        hparams.insert("layers".into(), 3i64.into());
        hparams.insert("optimizer".into(), "adam".into());
        hparams.insert("dropout".into(), true.into());

        let json = serde_json::to_value(&hparams).unwrap();
        assert_eq!(json["layers"], 3);
        assert_eq!(json["optimizer"], "adam");

        let back: Hyperparameters = serde_json::from_value(json).unwrap();
        assert_eq!(back["layers"], ParameterValue::Int(3));
        assert_eq!(back["lr"], ParameterValue::Float(0.001));
        assert_eq!(back["dropout"], ParameterValue::Bool(true));
    }
}
