//! Database abstraction layer for chatsql.
//!
//! A [`DatabaseConnector`] opens one connection per request; the connection is
//! used for a single statement and then closed by the caller. There is no
//! pooling.

mod mock;
mod mysql;
mod types;

pub use mock::{MockConnector, MockStats};
pub use mysql::MySqlConnector;
pub use types::{Record, ResultSet, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Mysql,
    /// In-memory canned rows, for local runs without a database.
    Mock,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mock => "mock",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::Mysql),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mysql | Self::Mock => 3306,
        }
    }
}

/// Creates the connector for the configured backend.
///
/// This is the central factory function for database access.
pub fn connector(config: &DatabaseConfig) -> Arc<dyn DatabaseConnector> {
    match config.backend {
        DatabaseBackend::Mysql => Arc::new(MySqlConnector::new(config.clone())),
        DatabaseBackend::Mock => Arc::new(MockConnector::sample()),
    }
}

/// Keeps at most `max_rows` rows, logging when anything is dropped.
pub(crate) fn cap_rows<T>(mut rows: Vec<T>, max_rows: usize) -> Vec<T> {
    if rows.len() > max_rows {
        tracing::warn!(
            "Query returned {} rows, truncating to {} rows",
            rows.len(),
            max_rows
        );
        rows.truncate(max_rows);
    }
    rows
}

/// Opens database connections.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Opens a new connection.
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>>;
}

/// A single open connection.
///
/// Owners must call [`DatabaseConnection::close`] when done, on every path.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Executes a statement with positional parameters and fetches all rows.
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
