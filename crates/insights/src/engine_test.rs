//! Engine tests against a fake store backend

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use crate::filter::{BreakdownSpec, FilterClause};
use crate::metric::{EventSelector, MetricDefinition};
use crate::query::{InsightEngine, MetricRequest, MAX_BREAKDOWN_GROUPS};
use crate::schema::{OperandType, PropOrigin, PropertyRef, PropertySchema, SchemaCatalog};
use crate::timerange::{ResolvedRange, TimeRange};
use crate::Granularity;
use vantage_store::{Column, DataType, QueryParams, QueryResult, StoreBackend, StoreError};

/// Returns a canned result and records what it was asked to run
struct FakeBackend {
    result: QueryResult,
    seen: Arc<Mutex<Vec<(String, QueryParams)>>>,
}

impl FakeBackend {
    fn new(result: QueryResult) -> Self {
        Self {
            result,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn empty() -> Self {
        Self::new(QueryResult::empty())
    }

    fn capture_log(&self) -> Arc<Mutex<Vec<(String, QueryParams)>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl StoreBackend for FakeBackend {
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, StoreError> {
        self.seen
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));
        Ok(self.result.clone())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn catalog() -> SchemaCatalog {
    SchemaCatalog::new(vec![PropertySchema {
        key: "country".into(),
        operand_type: OperandType::String,
        origin: PropOrigin::Event,
    }])
}

fn three_day_range() -> ResolvedRange {
    ResolvedRange {
        from: NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        to: NaiveDate::from_ymd_opt(2024, 1, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    }
}

fn request() -> MetricRequest {
    MetricRequest {
        project_id: "p1".into(),
        metric: MetricDefinition::EventCount {
            event: EventSelector::Named("page_view".into()),
        },
        filters: Vec::new(),
        breakdown: BreakdownSpec::none(),
        range: TimeRange::Explicit {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        },
        granularity: Granularity::Day,
        timezone: "UTC".into(),
    }
}

fn single_columns() -> Vec<Column> {
    vec![
        Column::new("day", DataType::String, false),
        Column::new("count", DataType::Int64, false),
    ]
}

fn breakdown_columns() -> Vec<Column> {
    vec![
        Column::new("breakdown", DataType::String, false),
        Column::new("average_count", DataType::Float64, false),
        Column::new("data", DataType::Json, false),
    ]
}

#[tokio::test]
async fn test_sparse_rows_are_gap_filled() {
    let result = QueryResult::new(
        single_columns(),
        vec![vec![json!("2024-01-02 00:00:00"), json!(5)]],
        3,
    );
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let series = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.data.len(), 3);
    assert_eq!(s.data["2024-01-01 00:00:00"], 0.0);
    assert_eq!(s.data["2024-01-02 00:00:00"], 5.0);
    assert_eq!(s.data["2024-01-03 00:00:00"], 0.0);
    // round(10 * 5 / 3) / 10
    assert_eq!(s.average_count, 1.7);
    assert_eq!(s.event_label, "page_view");
    assert!(s.breakdown.is_none());
}

#[tokio::test]
async fn test_empty_result_yields_no_series() {
    let engine = InsightEngine::new(Box::new(FakeBackend::empty()));

    let series = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    assert!(series.is_empty());
}

#[tokio::test]
async fn test_series_keys_match_skeleton_exactly() {
    // A stray key outside the range must not leak into the series
    let result = QueryResult::new(
        single_columns(),
        vec![
            vec![json!("2024-01-02 00:00:00"), json!(5)],
            vec![json!("2023-12-25 00:00:00"), json!(99)],
        ],
        3,
    );
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let series = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    let keys: Vec<&String> = series[0].data.keys().collect();
    assert_eq!(
        keys,
        vec![
            "2024-01-01 00:00:00",
            "2024-01-02 00:00:00",
            "2024-01-03 00:00:00"
        ]
    );
}

#[tokio::test]
async fn test_numeric_cells_rendered_as_strings_are_parsed() {
    // JSON row formats render 64-bit integers as strings
    let result = QueryResult::new(
        single_columns(),
        vec![vec![json!("2024-01-01 00:00:00"), json!("42")]],
        3,
    );
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let series = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    assert_eq!(series[0].data["2024-01-01 00:00:00"], 42.0);
}

#[tokio::test]
async fn test_breakdown_series_preserve_store_order() {
    let result = QueryResult::new(
        breakdown_columns(),
        vec![
            vec![
                json!("US"),
                json!(4.5),
                json!([["2024-01-01 00:00:00", 9], ["2024-01-03 00:00:00", 4]]),
            ],
            vec![json!("DE"), json!(1.2), json!([["2024-01-02 00:00:00", 3]])],
        ],
        5,
    );
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let mut req = request();
    req.breakdown = BreakdownSpec::by(PropertyRef::event("country"));
    let series = engine
        .query_metric_resolved(&req, &catalog(), three_day_range())
        .await
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].breakdown.as_deref(), Some("US"));
    assert_eq!(series[0].average_count, 4.5);
    assert_eq!(series[0].data["2024-01-01 00:00:00"], 9.0);
    assert_eq!(series[0].data["2024-01-02 00:00:00"], 0.0);
    assert_eq!(series[0].data["2024-01-03 00:00:00"], 4.0);

    assert_eq!(series[1].breakdown.as_deref(), Some("DE"));
    assert_eq!(series[1].data["2024-01-02 00:00:00"], 3.0);
    assert_eq!(series[1].data["2024-01-01 00:00:00"], 0.0);
}

#[tokio::test]
async fn test_breakdown_groups_capped() {
    let rows: Vec<Vec<serde_json::Value>> = (0..600)
        .map(|i| {
            vec![
                json!(format!("group-{i}")),
                json!(1.0),
                json!([["2024-01-01 00:00:00", 1]]),
            ]
        })
        .collect();
    let result = QueryResult::new(breakdown_columns(), rows, 5);
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let mut req = request();
    req.breakdown = BreakdownSpec::by(PropertyRef::event("country"));
    let series = engine
        .query_metric_resolved(&req, &catalog(), three_day_range())
        .await
        .unwrap();

    assert_eq!(series.len(), MAX_BREAKDOWN_GROUPS);
}

#[tokio::test]
async fn test_unknown_filter_property_still_executes() {
    let engine = InsightEngine::new(Box::new(FakeBackend::empty()));

    let mut req = request();
    req.filters = vec![FilterClause::string_is(
        PropertyRef::event("never_seen"),
        "x",
    )];
    let outcome = engine
        .query_metric_resolved(&req, &catalog(), three_day_range())
        .await;

    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_backend_receives_bound_params_not_values() {
    let backend = FakeBackend::empty();
    let log = backend.capture_log();
    let engine = InsightEngine::new(Box::new(backend));

    engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (sql, params) = &seen[0];
    assert!(!sql.contains("page_view"));
    assert!(!sql.contains("p1'"));
    assert!(sql.contains("{p0:String}"));
    let bound: Vec<String> = params.iter().map(|(_, v)| v.encode()).collect();
    assert!(bound.contains(&"page_view".to_string()));
}

#[tokio::test]
async fn test_repeat_queries_get_fresh_series_ids() {
    let result = QueryResult::new(
        single_columns(),
        vec![vec![json!("2024-01-01 00:00:00"), json!(2)]],
        3,
    );
    let engine = InsightEngine::new(Box::new(FakeBackend::new(result)));

    let a = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();
    let b = engine
        .query_metric_resolved(&request(), &catalog(), three_day_range())
        .await
        .unwrap();

    assert_ne!(a[0].id, b[0].id);
    assert_eq!(a[0].data, b[0].data);
    assert_eq!(a[0].average_count, b[0].average_count);
}
