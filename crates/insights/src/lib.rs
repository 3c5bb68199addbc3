//! Vantage Insights
//!
//! The metric query compiler and result shaper for Vantage product
//! analytics. Turns an abstract metric definition (event selection,
//! filters, breakdown, time bucketing, aggregation kind) into one
//! parameterized analytical statement against the event store, executes
//! it, and reshapes the sparse rows into dense, gap-filled time series
//! keyed by breakdown group.
//!
//! # Usage
//!
//! ```ignore
//! use vantage_insights::{
//!     BreakdownSpec, Granularity, InsightEngine, MetricDefinition,
//!     EventSelector, MetricRequest, SchemaCatalog, TimeRange,
//! };
//!
//! let engine = InsightEngine::new(Box::new(backend));
//!
//! let request = MetricRequest {
//!     project_id: "proj-1".into(),
//!     metric: MetricDefinition::UniqueUsers {
//!         event: EventSelector::Named("page_view".into()),
//!     },
//!     filters: Vec::new(),
//!     breakdown: BreakdownSpec::none(),
//!     range: TimeRange::Last30Days,
//!     granularity: Granularity::Day,
//!     timezone: "America/New_York".into(),
//! };
//!
//! let series = engine.query_metric(&request, &catalog).await?;
//! ```

pub mod bucket;
pub mod error;
pub mod filter;
pub mod metric;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod series;
pub mod sql;
pub mod timerange;
pub mod translate;

#[cfg(test)]
mod engine_test;

// Re-exports for convenience
pub use bucket::{BucketSkeleton, DateHeader, Granularity};
pub use error::{InsightError, Result};
pub use filter::{BreakdownSpec, FilterClause, FilterOperator, FilterValue};
pub use metric::{AggFn, EventSelector, MetricDefinition, ANY_EVENT};
pub use query::{InsightEngine, MetricRequest, MAX_BREAKDOWN_GROUPS};
pub use schema::{OperandType, PropOrigin, PropertyRef, PropertySchema, SchemaCatalog};
pub use series::ResultSeries;
pub use sql::{ParamBinder, SqlFragment};
pub use timerange::{ResolvedRange, TimeRange};
pub use translate::{parse_translation, ChartCandidate, ChartKind, ReportKind};
