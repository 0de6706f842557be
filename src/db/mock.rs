//! Mock database connector for testing.
//!
//! Returns canned rows and records every connect, statement and close so
//! tests can check that rejected queries never reach a connection and that
//! connections are always released.

use super::{cap_rows, DatabaseConnection, DatabaseConnector, Record, ResultSet, Value};
use crate::error::{ChatSqlError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters shared between a [`MockConnector`] and its connections.
#[derive(Debug, Default)]
pub struct MockStats {
    connects: AtomicUsize,
    closes: AtomicUsize,
    statements: Mutex<Vec<String>>,
}

impl MockStats {
    /// Number of connections opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of connections closed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Statements executed, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }
}

/// A connector that hands out in-memory connections.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    rows: ResultSet,
    connect_error: Option<String>,
    query_error: Option<String>,
    delay: Option<Duration>,
    max_rows: Option<usize>,
    stats: Arc<MockStats>,
}

impl MockConnector {
    /// Creates a connector whose queries return no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector returning a single sample customer row.
    pub fn sample() -> Self {
        Self::new().with_rows(vec![Record::new().with("id", 1).with("nome", "João")])
    }

    /// Sets the rows every query returns.
    pub fn with_rows(mut self, rows: ResultSet) -> Self {
        self.rows = rows;
        self
    }

    /// Makes `connect` fail with the given message.
    pub fn failing_connect(mut self, msg: impl Into<String>) -> Self {
        self.connect_error = Some(msg.into());
        self
    }

    /// Makes every query fail with the given message.
    pub fn failing_query(mut self, msg: impl Into<String>) -> Self {
        self.query_error = Some(msg.into());
        self
    }

    /// Makes every query wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Caps returned rows the way the MySQL connector does.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Returns the shared counters.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl DatabaseConnector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        if let Some(msg) = &self.connect_error {
            return Err(ChatSqlError::connection(msg.clone()));
        }
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            rows: self.rows.clone(),
            query_error: self.query_error.clone(),
            delay: self.delay,
            max_rows: self.max_rows,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockConnection {
    rows: ResultSet,
    query_error: Option<String>,
    delay: Option<Duration>,
    max_rows: Option<usize>,
    stats: Arc<MockStats>,
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn fetch_all(&mut self, sql: &str, _params: &[Value]) -> Result<ResultSet> {
        if let Ok(mut statements) = self.stats.statements.lock() {
            statements.push(sql.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = &self.query_error {
            return Err(ChatSqlError::query(msg.clone()));
        }
        Ok(match self.max_rows {
            Some(max_rows) => cap_rows(self.rows.clone(), max_rows),
            None => self.rows.clone(),
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
