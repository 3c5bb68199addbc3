//! Filter and breakdown predicate building
//!
//! Turns typed filter clauses and a breakdown specification into SQL
//! fragments: the AND-combined where-section (always tenant-scoped and
//! time-bounded), the user-properties join when any referenced property is
//! user-scoped, and the breakdown select expression with optional min/max
//! pre-bucketing for continuous values.

use crate::bucket::event_time_expr;
use crate::error::{InsightError, Result};
use crate::filter::{BreakdownSpec, FilterClause, FilterOperator, FilterValue};
use crate::metric::EventSelector;
use crate::schema::{OperandType, PropOrigin, PropertyRef, SchemaCatalog};
use crate::sql::ParamBinder;
use crate::timerange::ResolvedRange;
use vantage_store::ParamValue;

/// A clause that can never match; used when a referenced property is
/// unknown to the sampled schema
const MATCH_NOTHING: &str = "0 = 1";

/// Everything needed to build the predicate fragments for one request
#[derive(Debug)]
pub struct PredicateInput<'a> {
    /// Tenant scope; every query is constrained to one project
    pub project_id: &'a str,
    /// Target events
    pub event: &'a EventSelector,
    /// Resolved `[from, to)` interval
    pub range: &'a ResolvedRange,
    /// Caller's timezone name
    pub timezone: &'a str,
    /// Filter clauses, AND-combined
    pub filters: &'a [FilterClause],
    /// Breakdown specification
    pub breakdown: &'a BreakdownSpec,
    /// Join the user-properties table even if no clause requires it
    /// (aggregated-property metrics over user-scoped properties)
    pub force_people_join: bool,
}

/// The prepared predicate fragments
#[derive(Debug, Default)]
pub struct PreparedFilters {
    /// AND-combined boolean where-section
    pub where_section: String,
    /// Join against the user-properties table, or empty
    pub join_section: String,
    /// Breakdown scalar expression ending in `AS breakdown`, when requested
    pub breakdown_select: Option<String>,
    /// Min/max boundary sub-query for numeric breakdowns, or empty
    pub breakdown_minmax: String,
}

/// Build the predicate fragments for one request
pub fn build_predicate(
    input: &PredicateInput<'_>,
    catalog: &SchemaCatalog,
    binder: &mut ParamBinder,
) -> Result<PreparedFilters> {
    binder.bind_named(crate::bucket::TIMEZONE_PARAM, input.timezone);
    let time_expr = event_time_expr();

    let mut parts: Vec<String> = Vec::new();

    // Tenant scoping comes first and is never omitted
    parts.push(format!("e.project_id = {}", binder.bind(input.project_id)));

    let from = input.range.from.format("%Y-%m-%d %H:%M:%S").to_string();
    let to = input.range.to.format("%Y-%m-%d %H:%M:%S").to_string();
    parts.push(format!(
        "{} >= parseDateTimeBestEffort({})",
        time_expr,
        binder.bind(from)
    ));
    parts.push(format!(
        "{} < parseDateTimeBestEffort({})",
        time_expr,
        binder.bind(to)
    ));

    if let Some(name) = input.event.name() {
        parts.push(format!("e.name = {}", binder.bind(name)));
    }

    let mut needs_people_join = input.force_people_join;

    for clause in input.filters {
        match catalog.resolve(&clause.property) {
            Some(_) => {
                if clause.property.origin == PropOrigin::User {
                    needs_people_join = true;
                }
                parts.push(clause_to_sql(clause, binder)?);
            }
            // Schema is sampled and may lag; an unknown property matches
            // nothing instead of failing the query
            None => parts.push(MATCH_NOTHING.to_string()),
        }
    }

    let (breakdown_select, breakdown_minmax, breakdown_needs_join) =
        build_breakdown(input, catalog, binder, &parts, needs_people_join)?;
    needs_people_join |= breakdown_needs_join;

    let where_section = if parts.is_empty() {
        "1 = 1".to_string()
    } else {
        parts.join(" AND ")
    };

    let join_section = if needs_people_join {
        "LEFT JOIN people AS p ON p.project_id = e.project_id AND p.distinct_id = e.distinct_id"
            .to_string()
    } else {
        String::new()
    };

    Ok(PreparedFilters {
        where_section,
        join_section,
        breakdown_select,
        breakdown_minmax,
    })
}

/// The JSON lookup expression for a property, typed per operand
fn property_lookup(
    property: &PropertyRef,
    operand_type: OperandType,
    binder: &mut ParamBinder,
) -> String {
    let source = match property.origin {
        PropOrigin::Event => "e.properties",
        PropOrigin::User => "p.properties",
    };
    let key = binder.bind(property.name.as_str());
    match operand_type {
        OperandType::String => format!("JSONExtractString({}, {})", source, key),
        OperandType::Number => format!("JSONExtractFloat({}, {})", source, key),
        OperandType::Boolean => format!("JSONExtractBool({}, {})", source, key),
        OperandType::Date => format!(
            "parseDateTimeBestEffortOrNull(JSONExtractString({}, {}))",
            source, key
        ),
        OperandType::Array | OperandType::Other => format!("JSONExtractRaw({}, {})", source, key),
    }
}

/// Translate one clause into a parameterized comparison
fn clause_to_sql(clause: &FilterClause, binder: &mut ParamBinder) -> Result<String> {
    use FilterOperator::*;

    let lookup = property_lookup(&clause.property, clause.operand_type, binder);

    let sql = match (&clause.operator, &clause.value) {
        (Is, FilterValue::Single(v)) => format!("{} = {}", lookup, binder.bind(v.as_str())),
        (Is, FilterValue::Multiple(vs)) => format!(
            "{} IN {}",
            lookup,
            binder.bind(ParamValue::StringArray(vs.clone()))
        ),
        (IsNot, FilterValue::Single(v)) => format!("{} != {}", lookup, binder.bind(v.as_str())),
        (IsNot, FilterValue::Multiple(vs)) => format!(
            "{} NOT IN {}",
            lookup,
            binder.bind(ParamValue::StringArray(vs.clone()))
        ),
        (Contains, FilterValue::Single(v)) => format!(
            "positionCaseInsensitive({}, {}) > 0",
            lookup,
            binder.bind(v.as_str())
        ),
        (NotContains, FilterValue::Single(v)) => format!(
            "positionCaseInsensitive({}, {}) = 0",
            lookup,
            binder.bind(v.as_str())
        ),
        (StartsWith, FilterValue::Single(v)) => {
            format!("startsWith({}, {})", lookup, binder.bind(v.as_str()))
        }
        (EndsWith, FilterValue::Single(v)) => {
            format!("endsWith({}, {})", lookup, binder.bind(v.as_str()))
        }
        (Equals, FilterValue::Number(n)) => format!("{} = {}", lookup, binder.bind(*n)),
        (NotEquals, FilterValue::Number(n)) => format!("{} != {}", lookup, binder.bind(*n)),
        (Gt, FilterValue::Number(n)) => format!("{} > {}", lookup, binder.bind(*n)),
        (Gte, FilterValue::Number(n)) => format!("{} >= {}", lookup, binder.bind(*n)),
        (Lt, FilterValue::Number(n)) => format!("{} < {}", lookup, binder.bind(*n)),
        (Lte, FilterValue::Number(n)) => format!("{} <= {}", lookup, binder.bind(*n)),
        (On, FilterValue::Single(v)) => format!(
            "toDate({}) = toDate(parseDateTimeBestEffort({}))",
            lookup,
            binder.bind(v.as_str())
        ),
        (Before, FilterValue::Single(v)) => format!(
            "{} < parseDateTimeBestEffort({})",
            lookup,
            binder.bind(v.as_str())
        ),
        (After, FilterValue::Single(v)) => format!(
            "{} > parseDateTimeBestEffort({})",
            lookup,
            binder.bind(v.as_str())
        ),
        (IsTrue, _) => format!("{} = 1", lookup),
        (IsFalse, _) => format!("{} = 0", lookup),
        (op, value) => {
            return Err(InsightError::InvalidFilter(format!(
                "operator {:?} cannot be applied to value {:?}",
                op, value
            )));
        }
    };

    Ok(sql)
}

/// Build the breakdown select expression and, for numeric breakdowns, the
/// min/max boundary sub-query
fn build_breakdown(
    input: &PredicateInput<'_>,
    catalog: &SchemaCatalog,
    binder: &mut ParamBinder,
    where_parts: &[String],
    outer_needs_join: bool,
) -> Result<(Option<String>, String, bool)> {
    if input.breakdown.is_empty() {
        return Ok((None, String::new(), false));
    }

    let mut needs_join = false;
    for property in &input.breakdown.properties {
        if property.origin == PropOrigin::User {
            needs_join = true;
        }
    }

    // A single numeric breakdown pre-buckets continuous values into ten
    // equal-width ranges; everything else is a string lookup
    if input.breakdown.properties.len() == 1 {
        let property = &input.breakdown.properties[0];
        let is_numeric = catalog
            .resolve(property)
            .map(|s| s.operand_type == OperandType::Number)
            .unwrap_or(false);

        if is_numeric {
            let val = property_lookup(property, OperandType::Number, binder);
            let inner_where = where_parts.join(" AND ");
            // The sub-query re-evaluates the outer where-section, so it
            // needs the people join whenever the outer query does
            let join = if needs_join || outer_needs_join {
                " LEFT JOIN people AS p ON p.project_id = e.project_id AND p.distinct_id = e.distinct_id"
            } else {
                ""
            };
            let minmax = format!(
                ", (SELECT min({val}) AS bd_min, max({val}) AS bd_max FROM events AS e{join} WHERE {inner_where}) AS bd_bounds",
            );

            let width = "((bd_max - bd_min) / 10)";
            let idx = format!("least(9., floor(({val} - bd_min) / {width}))");
            let lo = format!("round(bd_min + {idx} * {width}, 2)");
            let hi = format!("round(bd_min + ({idx} + 1) * {width}, 2)");
            let select = format!(
                "if(bd_max = bd_min, toString(bd_min), concat(toString({lo}), ' - ', toString({hi}))) AS breakdown",
            );
            return Ok((Some(select), minmax, needs_join));
        }
    }

    // String breakdowns: one lookup, or several concatenated
    let lookups: Vec<String> = input
        .breakdown
        .properties
        .iter()
        .map(|property| property_lookup(property, OperandType::String, binder))
        .collect();

    let select = if lookups.len() == 1 {
        format!("{} AS breakdown", lookups[0])
    } else {
        format!("concat({}) AS breakdown", lookups.join(", ' / ', "))
    };

    Ok((Some(select), String::new(), needs_join))
}
