//! Query assembly and execution
//!
//! Composes the predicate, aggregation, and bucketing fragments into one
//! statement per metric request, dispatches it with bound parameters, and
//! shapes the rows into dense series.

use chrono::Utc;

use crate::bucket::{event_time_expr, BucketSkeleton, Granularity};
use crate::error::Result;
use crate::filter::{BreakdownSpec, FilterClause};
use crate::metric::MetricDefinition;
use crate::predicate::{build_predicate, PredicateInput};
use crate::schema::{PropOrigin, SchemaCatalog};
use crate::series::{densify_breakdown, densify_single, ResultSeries, SeriesContext};
use crate::sql::{ParamBinder, SqlFragment};
use crate::timerange::{ResolvedRange, TimeRange};
use vantage_store::StoreBackend;

/// Maximum number of breakdown groups returned per request
pub const MAX_BREAKDOWN_GROUPS: usize = 500;

/// Parameter name for the aggregated property key
const PROP_PARAM: &str = "typeProp";

/// One metric query request
#[derive(Debug, Clone)]
pub struct MetricRequest {
    /// Tenant scope
    pub project_id: String,
    /// What to measure
    pub metric: MetricDefinition,
    /// Filter clauses, AND-combined
    pub filters: Vec<FilterClause>,
    /// Breakdown specification
    pub breakdown: BreakdownSpec,
    /// Requested time range
    pub range: TimeRange,
    /// Bucketing granularity
    pub granularity: Granularity,
    /// Caller's timezone name
    pub timezone: String,
}

/// The metric query compiler
///
/// Holds the injected store backend; requests are independent and
/// stateless, so concurrent use needs no coordination.
pub struct InsightEngine {
    backend: Box<dyn StoreBackend>,
}

impl InsightEngine {
    /// Create an engine with a store backend
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Get a reference to the underlying backend
    pub fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    /// Execute a metric request, resolving relative ranges against now
    pub async fn query_metric(
        &self,
        request: &MetricRequest,
        catalog: &SchemaCatalog,
    ) -> Result<Vec<ResultSeries>> {
        let resolved = request.range.resolve(Utc::now().naive_utc())?;
        self.query_metric_resolved(request, catalog, resolved).await
    }

    /// Execute a metric request against an already-resolved range
    pub async fn query_metric_resolved(
        &self,
        request: &MetricRequest,
        catalog: &SchemaCatalog,
        resolved: ResolvedRange,
    ) -> Result<Vec<ResultSeries>> {
        let skeleton = BucketSkeleton::build(&resolved, request.granularity);
        let statement = assemble(request, catalog, &resolved, skeleton.bucket_count())?;

        tracing::debug!(
            project = %request.project_id,
            measurement = request.metric.measurement(),
            buckets = skeleton.bucket_count(),
            bound_params = statement.params.len(),
            "executing metric query"
        );

        let result = self
            .backend
            .execute(&statement.sql, &statement.params)
            .await?;

        // Zero matching rows means "no data", which callers render
        // differently from all-zero buckets
        if result.is_empty() {
            return Ok(Vec::new());
        }

        let ctx = SeriesContext {
            event_label: request.metric.event_label(),
            measurement: request.metric.measurement().to_string(),
            granularity: request.granularity,
        };

        let series = if request.breakdown.is_empty() {
            densify_single(&result, &skeleton, &ctx)
        } else {
            densify_breakdown(&result, &skeleton, &ctx)
        };

        Ok(series)
    }
}

/// Assemble the full statement and its parameter bindings for one request
pub(crate) fn assemble(
    request: &MetricRequest,
    catalog: &SchemaCatalog,
    resolved: &ResolvedRange,
    bucket_count: usize,
) -> Result<SqlFragment> {
    let mut binder = ParamBinder::new();

    let force_people_join = request
        .metric
        .property()
        .map(|p| p.origin == PropOrigin::User)
        .unwrap_or(false);

    let prepared = build_predicate(
        &PredicateInput {
            project_id: &request.project_id,
            event: request.metric.event(),
            range: resolved,
            timezone: &request.timezone,
            filters: &request.filters,
            breakdown: &request.breakdown,
            force_people_join,
        },
        catalog,
        &mut binder,
    )?;

    let bucket_expr = request.granularity.bucket_expr(&event_time_expr());

    // Inner aggregation expression per measurement kind; cents scaling for
    // aggregated-property happens here because this is its outermost level
    let (agg_select, per_actor_group) = match &request.metric {
        MetricDefinition::EventCount { .. } => ("toInt32(count()) AS count".to_string(), false),
        MetricDefinition::UniqueUsers { .. } => (
            "toInt32(count(DISTINCT e.distinct_id)) AS count".to_string(),
            false,
        ),
        MetricDefinition::FrequencyPerUser { .. } => {
            ("toInt32(count()) AS count".to_string(), true)
        }
        MetricDefinition::AggregatedProperty { property, agg, .. } => {
            let source = match property.origin {
                PropOrigin::Event => "e.properties",
                PropOrigin::User => "p.properties",
            };
            let key = binder.bind_named(PROP_PARAM, property.name.as_str());
            let scale = if agg.is_cents_scaled() { " / 100" } else { "" };
            (
                format!(
                    "{}(JSONExtractFloat({}, {})){} AS count",
                    agg.sql_fn(),
                    source,
                    key,
                    scale
                ),
                false,
            )
        }
    };

    let breakdown_select = prepared
        .breakdown_select
        .as_deref()
        .map(|s| format!(", {}", s))
        .unwrap_or_default();

    let mut group_by = "day".to_string();
    if per_actor_group {
        group_by.push_str(", e.distinct_id");
    }
    if prepared.breakdown_select.is_some() {
        group_by.push_str(", breakdown");
    }

    let join = if prepared.join_section.is_empty() {
        String::new()
    } else {
        format!(" {}", prepared.join_section)
    };

    let mut query = format!(
        "SELECT {bucket_expr} AS day, {agg_select}{breakdown_select} \
         FROM events AS e{minmax}{join} \
         WHERE {where_section} \
         GROUP BY {group_by} \
         ORDER BY day ASC",
        minmax = prepared.breakdown_minmax,
        where_section = prepared.where_section,
    );

    // Frequency re-aggregates per-actor counts per bucket in an outer
    // query; cents scaling for this kind applies only at this level
    if let MetricDefinition::FrequencyPerUser { agg, .. } = &request.metric {
        let scale = if agg.is_cents_scaled() { " / 100" } else { "" };
        let outer_breakdown = if prepared.breakdown_select.is_some() {
            ", breakdown"
        } else {
            ""
        };
        query = format!(
            "SELECT day, {agg_fn}(x.count){scale} AS count{outer_breakdown} \
             FROM ({query}) AS x \
             GROUP BY day{outer_breakdown} \
             ORDER BY day ASC",
            agg_fn = agg.sql_fn(),
        );
    }

    // Breakdown wrap ranks groups by descending average and caps them
    if prepared.breakdown_select.is_some() {
        query = format!(
            "SELECT breakdown, round(sum(count) / {bucket_count}, 1) AS average_count, \
             groupArray((day, count)) AS data \
             FROM ({query}) \
             GROUP BY breakdown \
             ORDER BY average_count DESC \
             LIMIT {MAX_BREAKDOWN_GROUPS}",
        );
    }

    Ok(SqlFragment {
        sql: query,
        params: binder.into_params(),
    })
}
