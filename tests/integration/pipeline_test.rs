//! End-to-end request tests against the mock LLM and mock database.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use chatsql::db::{MockConnector, Record, Value};
use chatsql::llm::{MockLlmClient, Translator};
use chatsql::query::QueryExecutor;
use chatsql::safety::SafetyMode;
use chatsql::schema::SchemaDescriptor;
use chatsql::server::{router, AppState, PerguntaResponse};
use http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn app(llm: MockLlmClient, connector: &MockConnector, mode: SafetyMode) -> axum::Router {
    let schema = Arc::new(SchemaDescriptor::bundled().unwrap());
    let translator = Translator::new(Arc::new(llm), schema);
    let executor = QueryExecutor::new(
        mode.build(),
        Arc::new(connector.clone()),
        Duration::from_secs(5),
    );
    router(Arc::new(AppState::new(translator, executor)))
}

async fn ask(app: axum::Router, question: &str) -> PerguntaResponse {
    let body = serde_json::json!({ "pergunta": question });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pergunta")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_aggregate_question() {
    let llm = MockLlmClient::new().with_response(
        "departamento",
        "Pensando...\n\n```sql\nSELECT d.nome AS departamento, COUNT(os.id) AS total\nFROM os JOIN departamentos d ON os.departamento_id = d.id\nGROUP BY d.nome;\n```",
    );
    let connector = MockConnector::new().with_rows(vec![
        Record::new().with("departamento", "Oficina").with("total", 12),
        Record::new().with("departamento", "Funilaria").with("total", Value::Null),
    ]);

    let resp = ask(
        app(llm, &connector, SafetyMode::Keyword),
        "Quantas os por departamento?",
    )
    .await;

    assert!(resp.query.starts_with("SELECT d.nome AS departamento"));
    assert!(resp.tabela_html.contains("<th>Departamento</th><th>Total</th>"));
    assert!(resp.tabela_html.contains("<tr><td>Funilaria</td><td></td></tr>"));
    assert_eq!(connector.stats().connects(), 1);
    assert_eq!(connector.stats().closes(), 1);
}

#[tokio::test]
async fn test_keyword_hidden_in_subquery_is_blocked() {
    let llm = MockLlmClient::new().with_response(
        "limpar",
        "```sql\nSELECT * FROM (DELETE FROM clientes) t;\n```",
    );
    let connector = MockConnector::sample();

    let resp = ask(app(llm, &connector, SafetyMode::Keyword), "limpar clientes").await;

    assert_eq!(
        resp.tabela_html,
        "Comando SQL não permitido detectado na query: 'DELETE'"
    );
    assert_eq!(connector.stats().connects(), 0);
}

#[tokio::test]
async fn test_chained_statement_passes_keyword_gate_but_not_strict_gate() {
    let answer = "```sql\nSELECT 1; SELECT SLEEP(10);\n```";
    let keyword_connector = MockConnector::sample();
    let strict_connector = MockConnector::sample();

    ask(
        app(
            MockLlmClient::new().with_response("sono", answer),
            &keyword_connector,
            SafetyMode::Keyword,
        ),
        "sono",
    )
    .await;
    let strict = ask(
        app(
            MockLlmClient::new().with_response("sono", answer),
            &strict_connector,
            SafetyMode::Strict,
        ),
        "sono",
    )
    .await;

    assert_eq!(keyword_connector.stats().connects(), 1);
    assert_eq!(strict_connector.stats().connects(), 0);
    assert_eq!(strict.tabela_html, "Apenas uma instrução SQL é permitida por query.");
}

#[tokio::test]
async fn test_llm_failure_is_reported_and_nothing_runs() {
    let connector = MockConnector::sample();
    let resp = ask(
        app(
            MockLlmClient::new().failing("Rate limited. Please wait and try again."),
            &connector,
            SafetyMode::Keyword,
        ),
        "Liste os clientes",
    )
    .await;

    assert!(resp.query.starts_with("Erro na tradução da pergunta:"));
    assert!(resp.query.contains("Rate limited"));
    assert_eq!(
        resp.tabela_html,
        "Somente queries SELECT são permitidas para segurança."
    );
    assert_eq!(connector.stats().connects(), 0);
}
