//! Natural-language translator boundary
//!
//! The text-to-chart translator is an opaque external call; this module
//! only parses its already-produced JSON into a validated chart candidate.
//! Output that cannot be parsed fails fast instead of guessing a default
//! chart.

use serde::Deserialize;

use crate::error::{InsightError, Result};
use crate::metric::EventSelector;

/// Chart rendering kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Line chart
    Line,
    /// Bar chart
    Bar,
    /// Donut chart
    Donut,
}

/// Report kind behind a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Metric time series
    Insight,
    /// Funnel steps
    Funnel,
    /// Retention cohorts
    Retention,
}

/// A validated chart candidate parsed from translator output
#[derive(Debug, Clone)]
pub struct ChartCandidate {
    /// Chart rendering kind
    pub chart: ChartKind,
    /// Report kind
    pub report: ReportKind,
    /// Validated event selectors, in the translator's order
    pub events: Vec<EventSelector>,
}

/// Raw translator output shape
#[derive(Debug, Deserialize)]
struct RawTranslation {
    #[serde(rename = "reportType")]
    report_type: String,
    #[serde(rename = "eventNames", default)]
    event_names: Vec<String>,
    #[serde(rename = "step1EventName")]
    step1_event_name: Option<String>,
    #[serde(rename = "step2EventName")]
    step2_event_name: Option<String>,
    #[serde(rename = "initialEventName")]
    initial_event_name: Option<String>,
    #[serde(rename = "retainingEventName")]
    retaining_event_name: Option<String>,
}

/// Parse translator output against the project's known event names
///
/// Unknown event names are dropped; the wildcard sentinels AnyEvent and
/// AllEvents map to the `$*` selector. Unparseable JSON is a
/// `MalformedTranslation` error.
pub fn parse_translation(raw: &str, known_events: &[String]) -> Result<ChartCandidate> {
    let parsed: RawTranslation = serde_json::from_str(raw)
        .map_err(|e| InsightError::MalformedTranslation(e.to_string()))?;

    let (chart, report) = match parsed.report_type.as_str() {
        "line" => (ChartKind::Line, ReportKind::Insight),
        "bar" => (ChartKind::Bar, ReportKind::Insight),
        "donut" => (ChartKind::Donut, ReportKind::Insight),
        "funnel" => (ChartKind::Line, ReportKind::Funnel),
        "retention" => (ChartKind::Line, ReportKind::Retention),
        _ => (ChartKind::Line, ReportKind::Insight),
    };

    let mut names: Vec<String> = Vec::new();
    if let Some(name) = parsed.initial_event_name {
        names.push(name);
    }
    if let Some(name) = parsed.retaining_event_name {
        names.push(name);
    }
    if let Some(name) = parsed.step1_event_name {
        names.push(name);
    }
    if let Some(name) = parsed.step2_event_name {
        names.push(name);
    }
    names.extend(parsed.event_names);

    let events: Vec<EventSelector> = names
        .into_iter()
        .filter_map(|name| match name.as_str() {
            "AnyEvent" | "AllEvents" => Some(EventSelector::AnyEvent),
            _ if known_events.contains(&name) => Some(EventSelector::Named(name)),
            _ => None,
        })
        .collect();

    Ok(ChartCandidate {
        chart,
        report,
        events,
    })
}
