//! Folding per-execution extrema into cross-execution statistics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ht_types::{KeyMetric, MetricAggregate, ResultsRecord, Statistics};

use crate::execution::ExecutionMetric;

/// Collects per-execution mins and maxes, one execution at a time.
#[derive(Debug, Default, Clone)]
pub struct MetricsAggregator {
    mins: BTreeMap<String, Vec<f64>>,
    maxes: BTreeMap<String, Vec<f64>>,
    observed: usize,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, metrics: &BTreeMap<String, ExecutionMetric>) {
        for (name, metric) in metrics {
            self.mins.entry(name.clone()).or_default().push(metric.min);
            self.maxes.entry(name.clone()).or_default().push(metric.max);
        }
        self.observed += 1;
    }

    /// Number of executions observed so far.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn finish(self) -> BTreeMap<String, MetricAggregate> {
        let mut maxes = self.maxes;
        self.mins
            .into_iter()
            .filter_map(|(name, mins)| {
                let max_values = maxes.remove(&name)?;
                let aggregate = MetricAggregate {
                    min: Statistics::from_values(&mins)?,
                    max: Statistics::from_values(&max_values)?,
                };
                Some((name, aggregate))
            })
            .collect()
    }
}

/// Median of each configured key metric, read from its direction's bucket.
/// Key metrics that were never observed are left out.
pub fn project_key_metrics(
    metrics: &BTreeMap<String, MetricAggregate>,
    key_metrics: &[KeyMetric],
) -> BTreeMap<String, f64> {
    key_metrics
        .iter()
        .filter_map(|key| {
            metrics
                .get(&key.name)
                .map(|aggregate| (key.name.clone(), aggregate.bucket(key.direction).median))
        })
        .collect()
}

/// Order records best-first by their objective score. Records without a
/// score sort last.
pub fn rank_by_objective(mut records: Vec<ResultsRecord>) -> Vec<ResultsRecord> {
    records.sort_by(|a, b| match (a.objective_score(), b.objective_score()) {
        (Some((direction, a)), Some((_, b))) => {
            if direction.is_better(a, b) {
                Ordering::Less
            } else if direction.is_better(b, a) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_types::Direction;
    use rand::Rng;

    fn metric(min: f64, max: f64) -> ExecutionMetric {
        ExecutionMetric {
            min,
            max,
            history: vec![max, min],
        }
    }

    fn execution(entries: &[(&str, f64, f64)]) -> BTreeMap<String, ExecutionMetric> {
        entries
            .iter()
            .map(|(name, min, max)| (name.to_string(), metric(*min, *max)))
            .collect()
    }

    #[test]
    fn aggregates_mins_and_maxes_separately() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.observe(&execution(&[("loss", 0.2, 0.9)]));
        aggregator.observe(&execution(&[("loss", 0.4, 0.7)]));
        aggregator.observe(&execution(&[("loss", 0.3, 1.1)]));
        assert_eq!(aggregator.observed(), 3);

        let metrics = aggregator.finish();
        let loss = metrics["loss"];
        assert_eq!(loss.min.min, 0.2);
        assert_eq!(loss.min.max, 0.4);
        assert!((loss.min.mean - 0.3).abs() < 1e-12);
        assert_eq!(loss.min.median, 0.3);
        assert_eq!(loss.max.min, 0.7);
        assert_eq!(loss.max.max, 1.1);
        assert_eq!(loss.max.median, 0.9);
    }

    #[test]
    fn metrics_missing_from_some_executions() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.observe(&execution(&[("loss", 0.2, 0.9), ("val_loss", 0.3, 0.8)]));
        aggregator.observe(&execution(&[("loss", 0.4, 0.7)]));

        let metrics = aggregator.finish();
        assert_eq!(metrics["val_loss"].min.median, 0.3);
        assert!((metrics["loss"].min.median - 0.3).abs() < 1e-12);
    }

    #[test]
    fn aggregate_matches_direct_statistics() {
        let mut rng = rand::rng();
        let mut aggregator = MetricsAggregator::new();
        let mut mins = Vec::new();
        for _ in 0..25 {
            let min = rng.random_range(0.0..1.0);
            let max = min + rng.random_range(0.0..1.0);
            mins.push(min);
            aggregator.observe(&execution(&[("accuracy", min, max)]));
        }

        let metrics = aggregator.finish();
        assert_eq!(metrics["accuracy"].min, Statistics::from_values(&mins).unwrap());
    }

    #[test]
    fn key_metrics_projection_skips_unknown_names() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.observe(&execution(&[("loss", 0.2, 0.9), ("accuracy", 0.5, 0.8)]));
        aggregator.observe(&execution(&[("loss", 0.4, 0.7), ("accuracy", 0.6, 0.9)]));
        let metrics = aggregator.finish();

        let key_metrics = project_key_metrics(
            &metrics,
            &[
                KeyMetric::new("loss", Direction::Min),
                KeyMetric::new("accuracy", Direction::Max),
                KeyMetric::new("val_accuracy", Direction::Max),
            ],
        );

        assert_eq!(key_metrics.len(), 2);
        assert_eq!(key_metrics["loss"], metrics["loss"].min.median);
        assert_eq!(key_metrics["accuracy"], metrics["accuracy"].max.median);
        assert!(!key_metrics.contains_key("val_accuracy"));
    }

    fn record(idx: &str, objective: Option<(&str, Direction)>, median: f64) -> ResultsRecord {
        use ht_types::{InstanceInfo, MetaData, MetricConfig};

        let stats = Statistics::from_values(&[median]).unwrap();
        let metrics_config = objective
            .map(|(name, direction)| {
                vec![MetricConfig {
                    name: name.to_string(),
                    direction,
                    is_objective: true,
                }]
            })
            .unwrap_or_default();
        ResultsRecord {
            instance: InstanceInfo {
                idx: idx.to_string(),
                hyperparameters: Default::default(),
                batch_size: 32,
                training_size: 10,
                validation_size: 0,
                execution_trained: 1,
                objective: objective.map(|(name, _)| name.to_string()),
                metrics_config,
            },
            executions: Vec::new(),
            metrics: [("loss".to_string(), MetricAggregate { min: stats, max: stats })]
                .into_iter()
                .collect(),
            key_metrics: BTreeMap::new(),
            meta_data: MetaData::new("p", "a", idx),
        }
    }

    #[test]
    fn ranking_follows_objective_direction() {
        let minimized = Some(("loss", Direction::Min));
        let ranked = rank_by_objective(vec![
            record("b", minimized, 0.5),
            record("none", None, 0.0),
            record("a", minimized, 0.2),
            record("c", minimized, 0.9),
        ]);
        let order: Vec<&str> = ranked.iter().map(|r| r.instance.idx.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "none"]);

        let maximized = Some(("loss", Direction::Max));
        let ranked = rank_by_objective(vec![
            record("low", maximized, 0.1),
            record("high", maximized, 0.7),
        ]);
        assert_eq!(ranked[0].instance.idx, "high");
    }
}
