//! Store backend trait and implementations

pub mod clickhouse;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::params::QueryParams;
use crate::result::QueryResult;

/// Store backend trait
///
/// The compiler is handed a backend rather than reaching for a global
/// client, so tests can substitute fakes and concurrent tenants can share
/// a pooled connection.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Execute a SQL statement with named bound parameters
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, StoreError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validate SQL - only allow SELECT and WITH (CTE) statements
///
/// This is a guardrail against accidental destructive statements, not a
/// security boundary; user-supplied values never reach the statement text.
pub fn validate_sql(sql: &str) -> Result<(), StoreError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(StoreError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    // Block SELECT ... INTO (creates tables in some databases)
    if upper.contains(" INTO ") && !upper.contains("INSERT INTO") {
        return Err(StoreError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Disallow multiple statements; allow a trailing semicolon
    if trimmed.contains(';') && !trimmed.ends_with(';') {
        return Err(StoreError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sql_select() {
        assert!(validate_sql("SELECT * FROM events").is_ok());
        assert!(validate_sql("  select count() from events  ").is_ok());
    }

    #[test]
    fn test_validate_sql_with() {
        assert!(validate_sql("WITH cte AS (SELECT 1) SELECT * FROM cte").is_ok());
    }

    #[test]
    fn test_validate_sql_invalid() {
        assert!(validate_sql("INSERT INTO events VALUES (1)").is_err());
        assert!(validate_sql("DROP TABLE events").is_err());
        assert!(validate_sql("TRUNCATE TABLE events").is_err());
    }

    #[test]
    fn test_validate_sql_multiple_statements() {
        assert!(validate_sql("SELECT 1; DROP TABLE events").is_err());
        assert!(validate_sql("SELECT 1;").is_ok());
    }

    #[test]
    fn test_validate_sql_subqueries_ok() {
        assert!(validate_sql("SELECT * FROM (SELECT 1 AS x) sub").is_ok());
    }

    #[test]
    fn test_validate_sql_select_into_blocked() {
        assert!(validate_sql("SELECT * INTO backup FROM events").is_err());
    }
}
