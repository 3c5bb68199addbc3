//! Vantage Store - analytical store access for Vantage
//!
//! Provides the store-access abstraction used by the metric query compiler:
//!
//! - **StoreBackend**: trait for executing parameterized SQL
//! - **ClickHouseBackend**: production backend over the ClickHouse HTTP interface
//! - **QueryParams**: named bound parameters (values are never interpolated
//!   into statement text)
//! - **QueryResult**: unified tabular result format
//!
//! # Usage
//!
//! ```ignore
//! use vantage_store::{ClickHouseBackend, StoreBackend, StoreConfig, QueryParams, ParamValue};
//!
//! let backend = ClickHouseBackend::new(&StoreConfig::new("http://localhost:8123", "analytics"));
//!
//! let mut params = QueryParams::new();
//! params.insert("name", ParamValue::String("page_view".into()));
//!
//! let result = backend
//!     .execute("SELECT count() AS c FROM events WHERE name = {name:String}", &params)
//!     .await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod params;
pub mod result;

// Re-exports
pub use backend::clickhouse::ClickHouseBackend;
pub use backend::StoreBackend;
pub use config::StoreConfig;
pub use error::StoreError;
pub use params::{ParamValue, QueryParams};
pub use result::{Column, DataType, QueryResult};
