//! Metric schema derivation from a model's declared metrics and losses.

use ht_types::{config_error, Metric, MetricId, MetricsCollection, TunerResult};

use crate::model::LossSpec;

/// Build the schema an instance aggregates against.
///
/// Declared metrics are tracked as `max`, losses as `min`; each gets a
/// `val_<name>` twin right after it when a validation set is present.
/// `objective` must name one of the resulting metrics.
pub fn build_schema(
    metrics: &[MetricId],
    loss: Option<&LossSpec>,
    with_validation: bool,
    objective: &str,
) -> TunerResult<MetricsCollection> {
    let loss = loss.ok_or_else(|| config_error!("model declares no loss"))?;

    let declared = metrics.iter().map(Metric::from);
    let losses = loss.metric_names().into_iter().map(Metric::minimize);

    let mut schema = MetricsCollection::new();
    for metric in declared.chain(losses) {
        let twin = with_validation.then(|| metric.validation_twin());
        schema.add(metric)?;
        if let Some(twin) = twin {
            schema.add(twin)?;
        }
    }

    schema.set_objective(objective)?;
    Ok(schema)
}
