//! Gated query execution.
//!
//! Every candidate goes through the configured validator first; only an
//! allowed statement ever reaches a connection. Each execution opens its own
//! connection and closes it before returning, whatever the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::db::{self, DatabaseConnection, DatabaseConnector, ResultSet, Value};
use crate::error::ChatSqlError;
use crate::safety::{QueryValidator, Rejection, ValidationVerdict};

/// Validates and executes candidate queries.
#[derive(Clone)]
pub struct QueryExecutor {
    validator: Arc<dyn QueryValidator>,
    connector: Arc<dyn DatabaseConnector>,
    query_timeout: Duration,
}

impl fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    /// Creates an executor from a validator and a connector.
    pub fn new(
        validator: Arc<dyn QueryValidator>,
        connector: Arc<dyn DatabaseConnector>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            validator,
            connector,
            query_timeout,
        }
    }

    /// Creates an executor for the configured backend.
    pub fn from_config(validator: Arc<dyn QueryValidator>, config: &DatabaseConfig) -> Self {
        Self::new(
            validator,
            db::connector(config),
            Duration::from_secs(config.query_timeout_secs),
        )
    }

    /// Validates `candidate` and, if allowed, runs it with `params` bound.
    ///
    /// Never fails: rejections and driver errors come back as variants.
    pub async fn execute(&self, candidate: &str, params: &[Value]) -> ExecutionResult {
        let sql = match self.validator.validate(candidate) {
            ValidationVerdict::Allowed(sql) => sql,
            ValidationVerdict::Rejected(rejection) => {
                warn!("Query rejected ({}): {}", rejection.reason, candidate);
                return ExecutionResult::Rejected(rejection);
            }
        };

        let start = Instant::now();
        let mut conn = match self.connector.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to open connection: {}", e);
                return ExecutionResult::failed(&e);
            }
        };

        let result = self.run(conn.as_mut(), &sql, params).await;

        if let Err(e) = conn.close().await {
            warn!("Failed to close connection: {}", e);
        }

        match result {
            Ok(rows) => {
                info!(
                    "Query returned {} rows in {:?}",
                    rows.len(),
                    start.elapsed()
                );
                ExecutionResult::Rows(rows)
            }
            Err(e) => {
                error!("Query failed: {}", e);
                ExecutionResult::failed(&e)
            }
        }
    }

    async fn run(
        &self,
        conn: &mut dyn DatabaseConnection,
        sql: &str,
        params: &[Value],
    ) -> Result<ResultSet, ChatSqlError> {
        tokio::time::timeout(self.query_timeout, conn.fetch_all(sql, params))
            .await
            .map_err(|_| {
                ChatSqlError::query(format!(
                    "tempo limite de {} segundos excedido",
                    self.query_timeout.as_secs_f64()
                ))
            })?
    }
}

/// Outcome of one gated execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// The statement ran; rows in database order.
    Rows(ResultSet),
    /// The gate refused the statement; no connection was opened.
    Rejected(Rejection),
    /// Connecting or executing failed. Holds the full message.
    Failed(String),
}

impl ExecutionResult {
    fn failed(error: &ChatSqlError) -> Self {
        Self::Failed(format!("Erro ao executar a query: {}", error.detail()))
    }

    /// Returns the rows, if the statement ran.
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows(rows) => write!(f, "{} registros", rows.len()),
            Self::Rejected(rejection) => write!(f, "{rejection}"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}
