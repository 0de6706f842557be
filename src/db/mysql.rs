//! MySQL database connector implementation.
//!
//! Opens a fresh `MySqlConnection` per request using sqlx and converts rows
//! into ordered [`Record`]s.

use crate::config::DatabaseConfig;
use crate::db::{cap_rows, DatabaseConnection, DatabaseConnector, Record, ResultSet, Value};
use crate::error::{ChatSqlError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, MySql, Row, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Connector that opens one MySQL connection per call.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    config: DatabaseConfig,
}

impl MySqlConnector {
    /// Creates a connector for the given configuration.
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let database = self
            .config
            .database
            .as_deref()
            .ok_or_else(|| ChatSqlError::config("Database name is required"))?;

        let mut options = MySqlConnectOptions::new()
            .host(self.config.host.as_deref().unwrap_or("localhost"))
            .port(self.config.port)
            .database(database);

        if let Some(user) = &self.config.user {
            options = options.username(user);
        }
        if let Some(password) = &self.config.password {
            options = options.password(password);
        }

        Ok(options)
    }
}

#[async_trait]
impl DatabaseConnector for MySqlConnector {
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        let options = self.connect_options()?;
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result =
                tokio::time::timeout(connect_timeout, MySqlConnection::connect_with(&options))
                    .await;

            let error = match result {
                Ok(Ok(conn)) => {
                    debug!("Connected to {}", self.config.display_string());
                    return Ok(Box::new(MySqlSession {
                        conn,
                        max_rows: self.config.max_rows,
                    }));
                }
                Ok(Err(e)) => {
                    let is_transient = is_transient_error(&e);
                    let error = map_connection_error(&e, &self.config);
                    if !is_transient {
                        return Err(error);
                    }
                    error
                }
                Err(_) => ChatSqlError::connection(format!(
                    "Connection to {} timed out after {} seconds",
                    self.config.display_string(),
                    self.config.connect_timeout_secs
                )),
            };
            last_error = Some(error);

            if attempt < MAX_RETRY_ATTEMPTS {
                warn!(
                    "Connection attempt {} failed (transient error), retrying in {:?}",
                    attempt, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2; // Exponential backoff
            }
        }

        Err(last_error
            .unwrap_or_else(|| ChatSqlError::connection("No connection attempt was made")))
    }
}

/// An open MySQL connection.
struct MySqlSession {
    conn: MySqlConnection,
    max_rows: usize,
}

#[async_trait]
impl DatabaseConnection for MySqlSession {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, param| bind_value(query, param));

        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ChatSqlError::query(format_query_error(&e)))?;

        Ok(cap_rows(rows, self.max_rows)
            .iter()
            .map(convert_row)
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ChatSqlError::connection(format!("Failed to close connection: {e}")))
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::UInt(u) => query.bind(*u),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
    }
}

/// Converts a sqlx MySqlRow to a record.
fn convert_row(row: &MySqlRow) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (
                col.name().to_string(),
                convert_value(row, i, col.type_info().name()),
            )
        })
        .collect()
}

/// How a column is read back, keyed by its MySQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    Double,
    Decimal,
    DateTime,
    Date,
    Time,
    Binary,
    Text,
}

impl ColumnKind {
    fn from_type_name(type_name: &str) -> Self {
        let type_name = type_name.to_uppercase();

        if type_name.ends_with("UNSIGNED") {
            return Self::Unsigned;
        }

        match type_name.as_str() {
            // TINYINT(1) is reported as BOOLEAN; flags like `paga` show as 0/1.
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Self::Signed,
            // Both carry the unsigned flag on the wire.
            "YEAR" | "BIT" => Self::Unsigned,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DECIMAL" => Self::Decimal,
            "DATETIME" | "TIMESTAMP" => Self::DateTime,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                Self::Binary
            }
            _ => Self::Text,
        }
    }
}

/// Widens an `f32` through its shortest decimal form, so 1.1 stays 1.1.
fn float_value(v: f32) -> Value {
    Value::Float(v.to_string().parse().unwrap_or(f64::from(v)))
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match ColumnKind::from_type_name(type_name) {
        ColumnKind::Signed => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int),

        ColumnKind::Unsigned => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(Value::UInt),

        ColumnKind::Float => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(float_value),

        ColumnKind::Double => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float),

        // Sent as text on the wire; keep full precision.
        ColumnKind::Decimal => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String),

        ColumnKind::DateTime => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),

        ColumnKind::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string())),

        ColumnKind::Time => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string())),

        ColumnKind::Binary => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes),

        ColumnKind::Text => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get_unchecked::<Option<String>, _>(index)
                    .ok()
                    .flatten()
            })
            .map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
        || error_str.contains("too many connections")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: &sqlx::Error, config: &DatabaseConfig) -> ChatSqlError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        ChatSqlError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") {
        ChatSqlError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("unknown database") {
        ChatSqlError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") {
        ChatSqlError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ChatSqlError::connection(error.to_string())
    }
}

/// Formats a query error the way MySQL clients print it: `number (state): message`.
fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => {
            match db_error.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
                Some(mysql_error) => format!(
                    "{} ({}): {}",
                    mysql_error.number(),
                    mysql_error.code().unwrap_or("HY000"),
                    mysql_error.message()
                ),
                None => db_error.message().to_string(),
            }
        }
        None => error.to_string(),
    }
}
