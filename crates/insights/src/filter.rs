//! Typed filter clauses and breakdown specifications
//!
//! A filter clause pairs a property reference with an operator drawn from
//! the operator set of the clause's declared operand type. Constructors
//! reject operator/type mismatches so an invalid clause never reaches
//! query construction.

use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};
use crate::schema::{OperandType, PropertyRef};

/// Filter operators, partitioned by operand type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // String operators
    /// Exact match
    Is,
    /// Exact mismatch
    IsNot,
    /// Substring match (also valid for arrays/other)
    Contains,
    /// Substring mismatch (also valid for arrays/other)
    NotContains,
    /// Prefix match
    StartsWith,
    /// Suffix match
    EndsWith,

    // Number operators
    /// Numeric equality
    Equals,
    /// Numeric inequality
    NotEquals,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,

    // Date operators
    /// Same calendar day
    On,
    /// Strictly before
    Before,
    /// Strictly after
    After,

    // Boolean operators
    /// Value is true
    IsTrue,
    /// Value is false
    IsFalse,
}

impl FilterOperator {
    /// Whether this operator belongs to the operator set of an operand type
    pub fn valid_for(&self, operand_type: OperandType) -> bool {
        use FilterOperator::*;
        match operand_type {
            OperandType::String => {
                matches!(self, Is | IsNot | Contains | NotContains | StartsWith | EndsWith)
            }
            OperandType::Number => matches!(self, Equals | NotEquals | Gt | Gte | Lt | Lte),
            OperandType::Date => matches!(self, On | Before | After),
            OperandType::Boolean => matches!(self, IsTrue | IsFalse),
            OperandType::Array | OperandType::Other => matches!(self, Contains | NotContains),
        }
    }
}

/// Value(s) a clause compares against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// No value (boolean operators carry the polarity themselves)
    None,
    /// Single string value
    Single(String),
    /// Value set (exact-match operators become IN lists)
    Multiple(Vec<String>),
    /// Numeric value
    Number(f64),
}

/// A single typed filter clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    /// The property this clause tests
    pub property: PropertyRef,
    /// Declared operand type of the property
    pub operand_type: OperandType,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Comparison value(s)
    pub value: FilterValue,
}

impl FilterClause {
    /// Create a clause, validating the operator against the operand type
    pub fn new(
        property: PropertyRef,
        operand_type: OperandType,
        operator: FilterOperator,
        value: FilterValue,
    ) -> Result<Self> {
        if !operator.valid_for(operand_type) {
            return Err(InsightError::InvalidFilter(format!(
                "operator {:?} is not valid for {:?} properties",
                operator, operand_type
            )));
        }
        Ok(Self {
            property,
            operand_type,
            operator,
            value,
        })
    }

    /// String equality shorthand
    pub fn string_is(property: PropertyRef, value: impl Into<String>) -> Self {
        Self {
            property,
            operand_type: OperandType::String,
            operator: FilterOperator::Is,
            value: FilterValue::Single(value.into()),
        }
    }

    /// String IN-list shorthand
    pub fn string_in(property: PropertyRef, values: Vec<String>) -> Self {
        Self {
            property,
            operand_type: OperandType::String,
            operator: FilterOperator::Is,
            value: FilterValue::Multiple(values),
        }
    }

    /// Numeric comparison shorthand
    pub fn number(property: PropertyRef, operator: FilterOperator, value: f64) -> Result<Self> {
        Self::new(
            property,
            OperandType::Number,
            operator,
            FilterValue::Number(value),
        )
    }
}

/// Zero or more grouping dimensions
///
/// When present, results are partitioned into named groups instead of one
/// flat series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownSpec {
    /// Properties to group by, in display order
    pub properties: Vec<PropertyRef>,
}

impl BreakdownSpec {
    /// No breakdown
    pub fn none() -> Self {
        Self::default()
    }

    /// Break down by a single property
    pub fn by(property: PropertyRef) -> Self {
        Self {
            properties: vec![property],
        }
    }

    /// Whether any breakdown is requested
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
