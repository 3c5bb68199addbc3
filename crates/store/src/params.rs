//! Named bound parameters for store queries
//!
//! Statements reference parameters as `{name:Type}` placeholders; values
//! travel alongside the statement and are bound by the store server, never
//! spliced into the SQL text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single bindable parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// UTF-8 string
    String(String),
    /// 64-bit float
    Float(f64),
    /// Signed 64-bit integer
    Int(i64),
    /// Array of strings (for IN lists)
    StringArray(Vec<String>),
}

impl ParamValue {
    /// Encode this value in ClickHouse HTTP parameter syntax
    ///
    /// Scalars are passed verbatim; arrays use the `['a','b']` literal form
    /// with quotes and backslashes escaped.
    pub fn encode(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::StringArray(values) => {
                let items: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")))
                    .collect();
                format!("[{}]", items.join(","))
            }
        }
    }

    /// ClickHouse type name for the `{name:Type}` placeholder
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "String",
            ParamValue::Float(_) => "Float64",
            ParamValue::Int(_) => "Int64",
            ParamValue::StringArray(_) => "Array(String)",
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

/// Named parameter map accompanying a statement
///
/// BTreeMap keeps iteration order stable so identical requests produce
/// identical outbound requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under a name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge another parameter map into this one
    pub fn merge(&mut self, other: QueryParams) {
        self.0.extend(other.0);
    }

    /// Look up a bound value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Iterate over (name, value) pairs in stable order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_encoding() {
        assert_eq!(ParamValue::String("page_view".into()).encode(), "page_view");
        assert_eq!(ParamValue::Float(1.5).encode(), "1.5");
        assert_eq!(ParamValue::Int(-3).encode(), "-3");
    }

    #[test]
    fn test_array_encoding_escapes_quotes() {
        let v = ParamValue::StringArray(vec!["a".into(), "it's".into()]);
        assert_eq!(v.encode(), "['a','it\\'s']");
    }

    #[test]
    fn test_params_stable_order() {
        let mut params = QueryParams::new();
        params.insert("p1", "b");
        params.insert("p0", "a");
        let names: Vec<&String> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["p0", "p1"]);
    }

    #[test]
    fn test_merge() {
        let mut a = QueryParams::new();
        a.insert("p0", "x");
        let mut b = QueryParams::new();
        b.insert("p1", 2.0);
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get("p1"), Some(&ParamValue::Float(2.0)));
    }
}
