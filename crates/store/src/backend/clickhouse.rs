//! ClickHouse backend
//!
//! Executes parameterized SQL against ClickHouse over the HTTP interface.
//! Statement text carries `{name:Type}` placeholders; values are sent as
//! `param_<name>` request parameters and bound server-side.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;

use crate::backend::{validate_sql, StoreBackend};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::params::QueryParams;
use crate::result::{Column, DataType, QueryResult};

/// ClickHouse backend over the HTTP interface
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: StoreConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a new ClickHouse backend from config
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Create from URL and database directly
    pub fn from_url(url: impl Into<String>, database: impl Into<String>) -> Self {
        let config = StoreConfig::new(url, database);
        Self::new(&config)
    }

    /// Build the request URL with the statement and its bound parameters
    fn build_url(&self, query: &str, params: &QueryParams) -> String {
        let mut url = format!(
            "{}/?database={}&max_execution_time={}",
            self.config.url, self.config.database, self.config.max_execution_time
        );

        url.push_str("&query=");
        url.push_str(&urlencoding::encode(query));

        for (name, value) in params.iter() {
            url.push_str("&param_");
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(&value.encode()));
        }

        url
    }

    /// Execute a statement and get the raw response body
    async fn execute_raw(&self, sql: &str, params: &QueryParams) -> Result<String, StoreError> {
        let url = self.build_url(sql, params);

        let mut request = self.client.get(&url);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Connection(format!("ClickHouse connection failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Execution(format!(
                "ClickHouse error ({}): {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| StoreError::Execution(format!("failed to read response: {}", e)))
    }
}

#[async_trait]
impl StoreBackend for ClickHouseBackend {
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, StoreError> {
        validate_sql(sql)?;

        let start = Instant::now();

        let query_with_format = format!("{} FORMAT JSONEachRow", sql.trim().trim_end_matches(';'));
        let response_text = self.execute_raw(&query_with_format, params).await?;

        let execution_time_ms = start.elapsed().as_millis() as u64;

        if response_text.trim().is_empty() {
            return Ok(QueryResult::new(Vec::new(), Vec::new(), execution_time_ms));
        }

        let json_rows: Vec<HashMap<String, serde_json::Value>> = response_text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    StoreError::Serialization(format!("failed to parse JSON row: {}", e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if json_rows.is_empty() {
            return Ok(QueryResult::new(Vec::new(), Vec::new(), execution_time_ms));
        }

        // Columns come from the first row's keys
        let first_row = &json_rows[0];
        let column_names: Vec<String> = first_row.keys().cloned().collect();

        let columns: Vec<Column> = column_names
            .iter()
            .map(|name| {
                let value = first_row.get(name).unwrap_or(&serde_json::Value::Null);
                Column::new(name.clone(), infer_data_type(value), true)
            })
            .collect();

        let rows: Vec<Vec<serde_json::Value>> = json_rows
            .iter()
            .map(|row| {
                column_names
                    .iter()
                    .map(|name| row.get(name).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();

        tracing::debug!(
            rows = rows.len(),
            cols = columns.len(),
            bound_params = params.len(),
            time_ms = execution_time_ms,
            "ClickHouse query executed"
        );

        Ok(QueryResult::new(columns, rows, execution_time_ms))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.execute_raw("SELECT 1", &QueryParams::new()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

/// Infer DataType from a JSON value
fn infer_data_type(value: &serde_json::Value) -> DataType {
    match value {
        serde_json::Value::Null => DataType::Unknown,
        serde_json::Value::Bool(_) => DataType::Boolean,
        serde_json::Value::Number(n) => {
            if n.is_f64() {
                DataType::Float64
            } else if n.is_u64() {
                DataType::UInt64
            } else {
                DataType::Int64
            }
        }
        serde_json::Value::String(_) => DataType::String,
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => DataType::Json,
    }
}

/// URL encoding helper
mod urlencoding {
    pub fn encode(s: &str) -> String {
        let mut result = String::with_capacity(s.len() * 3);
        for c in s.chars() {
            match c {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                    result.push(c);
                }
                ' ' => result.push_str("%20"),
                _ => {
                    for byte in c.to_string().as_bytes() {
                        result.push_str(&format!("%{:02X}", byte));
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn test_build_url_includes_params() {
        let backend = ClickHouseBackend::from_url("http://localhost:8123", "analytics");

        let mut params = QueryParams::new();
        params.insert("p0", "page_view");
        params.insert("tz", "UTC");

        let url = backend.build_url("SELECT count() FROM events WHERE name = {p0:String}", &params);

        assert!(url.contains("database=analytics"));
        assert!(url.contains("&param_p0=page_view"));
        assert!(url.contains("&param_tz=UTC"));
        // Placeholder stays in the statement text, never substituted
        assert!(url.contains(&urlencoding::encode("{p0:String}")));
    }

    #[test]
    fn test_build_url_encodes_values() {
        let backend = ClickHouseBackend::from_url("http://localhost:8123", "analytics");

        let mut params = QueryParams::new();
        params.insert("p0", "a value & more");

        let url = backend.build_url("SELECT 1", &params);
        assert!(url.contains("param_p0=a%20value%20%26%20more"));
    }

    #[test]
    fn test_array_param_encoding() {
        let v = ParamValue::StringArray(vec!["US".into(), "DE".into()]);
        assert_eq!(v.encode(), "['US','DE']");
        assert_eq!(v.type_name(), "Array(String)");
    }

    #[test]
    fn test_infer_data_type() {
        assert_eq!(infer_data_type(&serde_json::json!(1)), DataType::UInt64);
        assert_eq!(infer_data_type(&serde_json::json!(-1)), DataType::Int64);
        assert_eq!(infer_data_type(&serde_json::json!(1.5)), DataType::Float64);
        assert_eq!(infer_data_type(&serde_json::json!("x")), DataType::String);
        assert_eq!(infer_data_type(&serde_json::json!([1, 2])), DataType::Json);
    }

    #[test]
    fn test_urlencoding() {
        assert_eq!(urlencoding::encode("a b"), "a%20b");
        assert_eq!(urlencoding::encode("a=b&c"), "a%3Db%26c");
        assert_eq!(urlencoding::encode("safe-._~"), "safe-._~");
    }
}
