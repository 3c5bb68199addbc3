//! Metric definitions
//!
//! A metric names the statistical quantity a chart reports. Each
//! measurement kind is its own variant carrying only the fields it needs,
//! so an aggregated-property metric cannot exist without its property
//! reference and a unique-users metric cannot carry one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::PropertyRef;

/// Wildcard event value used by the translator and pickers
pub const ANY_EVENT: &str = "$*";

/// Which events a metric targets
///
/// On the wire both variants are plain strings; the wildcard is the `$*`
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSelector {
    /// A specific event by name
    Named(String),
    /// The "any/all events" wildcard
    AnyEvent,
}

impl Serialize for EventSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Named(name) => serializer.serialize_str(name),
            Self::AnyEvent => serializer.serialize_str(ANY_EVENT),
        }
    }
}

impl<'de> Deserialize<'de> for EventSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl EventSelector {
    /// Parse a selector from its wire value (`$*` is the wildcard)
    pub fn from_value(value: &str) -> Self {
        if value == ANY_EVENT {
            Self::AnyEvent
        } else {
            Self::Named(value.to_string())
        }
    }

    /// Human-readable label for series output
    pub fn label(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::AnyEvent => "Any event",
        }
    }

    /// The concrete event name, if this selector is not the wildcard
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::AnyEvent => None,
        }
    }
}

/// Aggregation function for numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFn {
    /// Sum of values
    Sum,
    /// Average
    #[default]
    Avg,
    /// Median
    Median,
    /// Minimum
    Min,
    /// Maximum
    Max,
    /// Sum, then divide the final aggregate by 100 (values stored as
    /// integer cents); the scaling happens once, at the outermost level
    SumDivide100,
}

impl AggFn {
    /// The store-side aggregate function name
    pub fn sql_fn(&self) -> &'static str {
        match self {
            Self::Sum | Self::SumDivide100 => "sum",
            Self::Avg => "avg",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the final aggregate is divided by 100
    pub fn is_cents_scaled(&self) -> bool {
        matches!(self, Self::SumDivide100)
    }
}

/// What a metric measures
///
/// The measurement kind decides the query shape: raw counts and property
/// aggregations run a single grouped query, unique users adds a distinct
/// count, and per-user frequency computes per-actor counts first and
/// re-aggregates them in an outer query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricDefinition {
    /// Count of matching event rows
    EventCount {
        /// Target events
        event: EventSelector,
    },
    /// Distinct actors firing matching events
    UniqueUsers {
        /// Target events
        event: EventSelector,
    },
    /// Per-actor event counts, re-aggregated per bucket
    FrequencyPerUser {
        /// Target events
        event: EventSelector,
        /// Outer aggregation over per-actor counts
        #[serde(default)]
        agg: AggFn,
    },
    /// Aggregate of a numeric property
    AggregatedProperty {
        /// Target events
        event: EventSelector,
        /// The numeric property to aggregate
        property: PropertyRef,
        /// Aggregation function
        #[serde(default)]
        agg: AggFn,
    },
}

impl MetricDefinition {
    /// The event selector for this metric
    pub fn event(&self) -> &EventSelector {
        match self {
            Self::EventCount { event }
            | Self::UniqueUsers { event }
            | Self::FrequencyPerUser { event, .. }
            | Self::AggregatedProperty { event, .. } => event,
        }
    }

    /// Human-readable label for the resulting series
    pub fn event_label(&self) -> String {
        self.event().label().to_string()
    }

    /// Short measurement name for serialization and logging
    pub fn measurement(&self) -> &'static str {
        match self {
            Self::EventCount { .. } => "event_count",
            Self::UniqueUsers { .. } => "unique_users",
            Self::FrequencyPerUser { .. } => "frequency_per_user",
            Self::AggregatedProperty { .. } => "aggregated_property",
        }
    }

    /// The aggregated property reference, when the kind carries one
    pub fn property(&self) -> Option<&PropertyRef> {
        match self {
            Self::AggregatedProperty { property, .. } => Some(property),
            _ => None,
        }
    }

    /// Whether this metric needs an outer wrapping query
    pub fn needs_outer_wrap(&self) -> bool {
        matches!(self, Self::FrequencyPerUser { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyRef;

    #[test]
    fn test_selector_wildcard() {
        assert_eq!(EventSelector::from_value("$*"), EventSelector::AnyEvent);
        assert_eq!(EventSelector::AnyEvent.label(), "Any event");
        assert_eq!(EventSelector::AnyEvent.name(), None);
    }

    #[test]
    fn test_selector_named() {
        let sel = EventSelector::from_value("page_view");
        assert_eq!(sel.label(), "page_view");
        assert_eq!(sel.name(), Some("page_view"));
    }

    #[test]
    fn test_selector_wire_roundtrip() {
        let json = serde_json::to_string(&EventSelector::AnyEvent).unwrap();
        assert_eq!(json, "\"$*\"");
        let back: EventSelector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventSelector::AnyEvent);

        let named: EventSelector = serde_json::from_str("\"page_view\"").unwrap();
        assert_eq!(named, EventSelector::Named("page_view".into()));
    }

    #[test]
    fn test_metric_wire_roundtrip_keeps_wildcard() {
        let metric = MetricDefinition::UniqueUsers {
            event: EventSelector::AnyEvent,
        };
        let json = serde_json::to_string(&metric).unwrap();
        let back: MetricDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metric);
        assert_eq!(back.event(), &EventSelector::AnyEvent);
    }

    #[test]
    fn test_agg_fn_sql() {
        assert_eq!(AggFn::Median.sql_fn(), "median");
        assert_eq!(AggFn::SumDivide100.sql_fn(), "sum");
        assert!(AggFn::SumDivide100.is_cents_scaled());
        assert!(!AggFn::Sum.is_cents_scaled());
    }

    #[test]
    fn test_metric_accessors() {
        let metric = MetricDefinition::AggregatedProperty {
            event: EventSelector::Named("purchase".into()),
            property: PropertyRef::event("amount"),
            agg: AggFn::SumDivide100,
        };
        assert_eq!(metric.measurement(), "aggregated_property");
        assert_eq!(metric.event_label(), "purchase");
        assert!(metric.property().is_some());
        assert!(!metric.needs_outer_wrap());

        let freq = MetricDefinition::FrequencyPerUser {
            event: EventSelector::AnyEvent,
            agg: AggFn::Avg,
        };
        assert!(freq.needs_outer_wrap());
        assert!(freq.property().is_none());
    }
}
