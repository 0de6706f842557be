//! Gated query execution for chatsql.

pub mod executor;

pub use executor::{ExecutionResult, QueryExecutor};
