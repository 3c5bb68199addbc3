//! Structured SQL fragments with explicit parameter bindings
//!
//! Every component of the compiler returns statement text paired with the
//! parameters it binds; the assembler concatenates fragments positionally.
//! Raw values never appear in statement text.

use vantage_store::{ParamValue, QueryParams};

/// A piece of SQL plus the parameters it binds
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// Statement text containing `{name:Type}` placeholders
    pub sql: String,
    /// Values bound by this fragment
    pub params: QueryParams,
}

impl SqlFragment {
    /// A fragment with no bindings
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: QueryParams::new(),
        }
    }

    /// An empty fragment
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the fragment contains any SQL
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Issues unique parameter names and accumulates their values
///
/// One binder lives for the duration of a single request so parameter
/// names never collide across fragments.
#[derive(Debug, Default)]
pub struct ParamBinder {
    params: QueryParams,
    counter: usize,
}

impl ParamBinder {
    /// Create a fresh binder
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under a fresh name, returning its placeholder text
    pub fn bind(&mut self, value: impl Into<ParamValue>) -> String {
        let value = value.into();
        let name = format!("p{}", self.counter);
        self.counter += 1;
        let placeholder = format!("{{{}:{}}}", name, value.type_name());
        self.params.insert(name, value);
        placeholder
    }

    /// Bind a value under an explicit name, returning its placeholder text
    ///
    /// Used for parameters referenced from multiple query levels (timezone,
    /// the aggregated property key).
    pub fn bind_named(&mut self, name: &str, value: impl Into<ParamValue>) -> String {
        let value = value.into();
        let placeholder = format!("{{{}:{}}}", name, value.type_name());
        self.params.insert(name.to_string(), value);
        placeholder
    }

    /// Consume the binder, yielding the accumulated parameter map
    pub fn into_params(self) -> QueryParams {
        self.params
    }

    /// Number of parameters bound so far
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether nothing has been bound
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_store::ParamValue;

    #[test]
    fn test_bind_issues_sequential_names() {
        let mut binder = ParamBinder::new();
        assert_eq!(binder.bind("a"), "{p0:String}");
        assert_eq!(binder.bind(1.5), "{p1:Float64}");
        assert_eq!(binder.bind(ParamValue::StringArray(vec!["x".into()])), "{p2:Array(String)}");

        let params = binder.into_params();
        assert_eq!(params.get("p0"), Some(&ParamValue::String("a".into())));
        assert_eq!(params.get("p1"), Some(&ParamValue::Float(1.5)));
    }

    #[test]
    fn test_bind_named_is_reusable() {
        let mut binder = ParamBinder::new();
        let a = binder.bind_named("timezone", "UTC");
        let b = binder.bind_named("timezone", "UTC");
        assert_eq!(a, b);
        assert_eq!(binder.len(), 1);
    }

    #[test]
    fn test_fragment_raw() {
        let frag = SqlFragment::raw("1 = 1");
        assert_eq!(frag.sql, "1 = 1");
        assert!(frag.params.is_empty());
        assert!(!frag.is_empty());
        assert!(SqlFragment::empty().is_empty());
    }
}
