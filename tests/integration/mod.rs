//! Integration tests for chatsql.
//!
//! `pipeline_test` runs the full request path against mocks; `mysql_test`
//! needs DATABASE_URL.

pub mod mysql_test;
pub mod pipeline_test;
