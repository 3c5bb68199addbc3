//! Result series and densification
//!
//! Raw store rows are sparse: buckets with no matching events are simply
//! absent. Densification overlays the raw rows onto a fresh copy of the
//! bucket skeleton so every series carries exactly one value per bucket,
//! zero-filled where the store returned nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bucket::{BucketSkeleton, Granularity};
use crate::query::MAX_BREAKDOWN_GROUPS;
use vantage_store::QueryResult;

/// One labeled time series in a metric response
///
/// Constructed fresh per query execution with a newly generated
/// identifier; never mutated afterwards and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSeries {
    /// Opaque identifier, unique per series, fresh per response
    pub id: Uuid,
    /// Human-readable event/metric label
    pub event_label: String,
    /// Measurement kind name
    pub measurement: String,
    /// Bucketing granularity
    pub granularity: Granularity,
    /// Breakdown group label, when the request had a breakdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<String>,
    /// Average value across the full range
    pub average_count: f64,
    /// Dense bucket-label to value mapping
    pub data: BTreeMap<String, f64>,
}

/// Labeling shared by every series one request produces
#[derive(Debug, Clone)]
pub(crate) struct SeriesContext {
    pub event_label: String,
    pub measurement: String,
    pub granularity: Granularity,
}

/// Shape the non-breakdown result: exactly one dense series
pub(crate) fn densify_single(
    result: &QueryResult,
    skeleton: &BucketSkeleton,
    ctx: &SeriesContext,
) -> Vec<ResultSeries> {
    let day_idx = result.column_index("day").unwrap_or(0);
    let count_idx = result.column_index("count").unwrap_or(1);

    let mut data = skeleton.zero_map();
    let mut sum = 0.0;

    for row in &result.rows {
        let day = row
            .get(day_idx)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let value = row.get(count_idx).map(json_to_f64).unwrap_or(0.0);

        sum += value;
        if let Some(slot) = data.get_mut(&day) {
            *slot = value;
        }
    }

    let average_count = one_decimal_average(sum, skeleton.bucket_count());

    vec![ResultSeries {
        id: Uuid::new_v4(),
        event_label: ctx.event_label.clone(),
        measurement: ctx.measurement.clone(),
        granularity: ctx.granularity,
        breakdown: None,
        average_count,
        data,
    }]
}

/// Shape the breakdown result: one dense series per returned group, in
/// store order (descending average)
pub(crate) fn densify_breakdown(
    result: &QueryResult,
    skeleton: &BucketSkeleton,
    ctx: &SeriesContext,
) -> Vec<ResultSeries> {
    let breakdown_idx = result.column_index("breakdown").unwrap_or(0);
    let average_idx = result.column_index("average_count").unwrap_or(1);
    let data_idx = result.column_index("data").unwrap_or(2);

    result
        .rows
        .iter()
        .take(MAX_BREAKDOWN_GROUPS)
        .map(|row| {
            let label = row
                .get(breakdown_idx)
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();

            let average_count = row.get(average_idx).map(json_to_f64).unwrap_or(0.0);

            let mut data = skeleton.zero_map();
            if let Some(serde_json::Value::Array(pairs)) = row.get(data_idx) {
                for pair in pairs {
                    if let serde_json::Value::Array(tuple) = pair {
                        let day = tuple.first().and_then(|v| v.as_str()).unwrap_or_default();
                        let value = tuple.get(1).map(json_to_f64).unwrap_or(0.0);
                        if let Some(slot) = data.get_mut(day) {
                            *slot = value;
                        }
                    }
                }
            }

            ResultSeries {
                id: Uuid::new_v4(),
                event_label: ctx.event_label.clone(),
                measurement: ctx.measurement.clone(),
                granularity: ctx.granularity,
                breakdown: Some(label),
                average_count,
                data,
            }
        })
        .collect()
}

/// Average with one-decimal rounding: `round(10 * sum / n) / 10`
fn one_decimal_average(sum: f64, bucket_count: usize) -> f64 {
    if bucket_count == 0 {
        return 0.0;
    }
    (10.0 * sum / bucket_count as f64).round() / 10.0
}

/// Coerce a JSON cell to f64; the store renders some numeric types as
/// strings in JSON row formats
fn json_to_f64(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
