//! Store configuration types

use serde::{Deserialize, Serialize};

/// ClickHouse store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Max execution time in seconds; the request fails as a whole when
    /// exceeded (no partial results)
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,
}

fn default_max_execution_time() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: default_max_execution_time(),
        }
    }
}

impl StoreConfig {
    /// Create a new config with URL and database
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.url, "http://localhost:8123");
        assert_eq!(config.max_execution_time, 60);
        assert!(config.username.is_none());
    }

    #[test]
    fn test_with_credentials() {
        let config = StoreConfig::new("http://ch:8123", "analytics")
            .with_credentials("reader", "secret");
        assert_eq!(config.database, "analytics");
        assert_eq!(config.username.as_deref(), Some("reader"));
    }
}
