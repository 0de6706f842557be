//! chatsql - ask questions in plain language, get read-only SQL answers.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod render;
pub mod safety;
pub mod schema;
pub mod server;
