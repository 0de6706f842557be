//! Error types for chatsql.
//!
//! Defines the main error enum used throughout the application. Messages for
//! the kinds that end up in an HTTP response are user-facing (Portuguese, as
//! served by the endpoint); the others are operator-facing.

use thiserror::Error;

/// Main error type for chatsql operations.
#[derive(Error, Debug)]
pub enum ChatSqlError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Erro de conexão com o banco de dados: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown columns, timeouts, etc.)
    #[error("Erro ao executar a query: {0}")]
    Query(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// The question could not be turned into a SELECT statement.
    #[error("Erro na tradução da pergunta: {0}")]
    Translation(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatSqlError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a translation error with the given message.
    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Translation(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Translation(_) => "Translation Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ChatSqlError.
pub type Result<T> = std::result::Result<T, ChatSqlError>;
