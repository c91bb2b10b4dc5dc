//! Metric derivation
//!
//! Every requested metric is evaluated against the full aggregated metric
//! buffer; the backend picks the raw events its formula needs.

use passcount_shared::{DeviceId, MetricSpec, MetricValue};
use tracing::debug;

use crate::aggregate::MetricBuffer;
use crate::backend::MetricEvaluator;
use crate::Result;

/// Derive each metric in request order.
pub fn derive_metrics<E: MetricEvaluator + ?Sized>(
    evaluator: &E,
    device: DeviceId,
    metrics: &[MetricSpec],
    buffer: &MetricBuffer,
) -> Result<Vec<MetricValue>> {
    metrics
        .iter()
        .map(|metric| {
            let value =
                evaluator.metric_value(device, metric.id, buffer.event_ids(), buffer.values())?;
            debug!("Metric [{}] = {} ({})", metric.name, value, value.kind().label());
            Ok(value)
        })
        .collect()
}
