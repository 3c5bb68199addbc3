//! Query result types
//!
//! Unified tabular format returned by every backend.

use serde::{Deserialize, Serialize};

/// Unified query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column definitions
    pub columns: Vec<Column>,

    /// Row data as JSON values (backend-agnostic)
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Total row count
    pub row_count: usize,

    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<serde_json::Value>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            execution_time_ms: 0,
        }
    }

    /// Check if result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,

    /// Whether the column is nullable
    pub nullable: bool,
}

impl Column {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Data types supported in query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit floating point
    Float64,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// Timestamp
    Timestamp,
    /// JSON value (arrays, tuples, objects)
    Json,
    /// Unknown/other type
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        let result = QueryResult::new(
            vec![
                Column::new("day", DataType::String, false),
                Column::new("count", DataType::Int64, false),
            ],
            vec![vec![
                serde_json::json!("2024-01-01 00:00:00"),
                serde_json::json!(5),
            ]],
            12,
        );

        assert_eq!(result.column_index("count"), Some(1));
        assert_eq!(result.column_index("missing"), None);
        assert_eq!(result.row_count, 1);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_empty() {
        let result = QueryResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.row_count, 0);
    }
}
