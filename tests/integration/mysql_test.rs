//! MySQL integration tests.
//!
//! Tests connectivity, parameter binding and value conversion against a real
//! server.

use std::sync::Arc;
use std::time::Duration;

use chatsql::config::DatabaseConfig;
use chatsql::db::{DatabaseConnector, MySqlConnector, Value};
use chatsql::query::{ExecutionResult, QueryExecutor};
use chatsql::safety::SafetyMode;

/// Helper to get test database config from environment.
fn get_test_config() -> Option<DatabaseConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    DatabaseConfig::from_connection_string(&url).ok()
}

fn executor(config: &DatabaseConfig) -> QueryExecutor {
    QueryExecutor::new(
        SafetyMode::Keyword.build(),
        Arc::new(MySqlConnector::new(config.clone())),
        Duration::from_secs(10),
    )
}

#[tokio::test]
async fn test_connect_with_valid_credentials() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let conn = MySqlConnector::new(config).connect().await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor(&config)
        .execute("SELECT 1 AS num, 'olá' AS saudacao, NULL AS vazio", &[])
        .await;

    let rows = result.rows().expect("query should succeed");
    assert_eq!(rows.len(), 1);
    let columns: Vec<&str> = rows[0].columns().collect();
    assert_eq!(columns, vec!["num", "saudacao", "vazio"]);
    assert_eq!(rows[0].get("num"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get("saudacao"), Some(&Value::from("olá")));
    assert_eq!(rows[0].get("vazio"), Some(&Value::Null));
}

#[tokio::test]
async fn test_year_and_float_values() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor(&config)
        .execute(
            "SELECT CAST(2024 AS YEAR) AS ano, CAST(1.1 AS FLOAT) AS valor",
            &[],
        )
        .await;

    let rows = result.rows().expect("query should succeed");
    assert_eq!(rows[0].get("ano"), Some(&Value::UInt(2024)));
    assert_eq!(rows[0].get("valor").map(Value::to_display_string), Some("1.1".to_string()));
}

#[tokio::test]
async fn test_positional_parameters_are_bound() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor(&config)
        .execute(
            "SELECT ? + 1 AS proximo, ? AS nome",
            &[Value::Int(41), Value::from("Ana")],
        )
        .await;

    let rows = result.rows().expect("query should succeed");
    assert_eq!(rows[0].get("nome"), Some(&Value::from("Ana")));
}

#[tokio::test]
async fn test_sql_error_is_reported() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor(&config)
        .execute("SELECT coluna_inexistente FROM tabela_inexistente", &[])
        .await;

    match result {
        ExecutionResult::Failed(msg) => {
            assert!(msg.starts_with("Erro ao executar a query:"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let config = DatabaseConfig {
        host: Some("invalid.host.that.does.not.exist.local".to_string()),
        database: Some("oficina".to_string()),
        user: Some("leitura".to_string()),
        password: Some("segredo".to_string()),
        connect_timeout_secs: 2,
        ..Default::default()
    };

    let result = executor(&config).execute("SELECT 1", &[]).await;

    assert!(matches!(result, ExecutionResult::Failed(_)));
}
