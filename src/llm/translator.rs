//! Natural-language to SQL translation.
//!
//! One call per question: build the prompt, ask the model, pull the SQL out of
//! the answer and make sure it at least opens with `SELECT`. The safety gate
//! in the executor still has the final word.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{ChatSqlError, Result};
use crate::llm::extract::ExtractionMode;
use crate::llm::{factory, prompt, LlmClient};
use crate::safety::starts_with_select;
use crate::schema::SchemaDescriptor;

/// Default deadline for one model call.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Turns questions into candidate SQL.
#[derive(Clone)]
pub struct Translator {
    client: Arc<dyn LlmClient>,
    schema: Arc<SchemaDescriptor>,
    extraction: ExtractionMode,
    timeout: Duration,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("tables", &self.schema.tables.len())
            .field("extraction", &self.extraction)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Translator {
    /// Creates a translator with fenced extraction and the default deadline.
    pub fn new(client: Arc<dyn LlmClient>, schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            client,
            schema,
            extraction: ExtractionMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Builds the client from configuration and binds it to `schema`.
    pub fn from_config(config: &LlmConfig, schema: Arc<SchemaDescriptor>) -> Result<Self> {
        let client = factory::create_client(config)?;
        Ok(Self::new(client, schema)
            .with_extraction(config.extraction)
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    /// Sets how SQL is pulled out of the answer.
    pub fn with_extraction(mut self, extraction: ExtractionMode) -> Self {
        self.extraction = extraction;
        self
    }

    /// Sets the deadline for one model call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Translates a question into a candidate `SELECT` statement.
    ///
    /// Every failure comes back as [`ChatSqlError::Translation`], whose
    /// message never starts with `SELECT`.
    pub async fn translate(&self, question: &str) -> Result<String> {
        let messages = prompt::build_messages(&self.schema, question);

        let raw = match tokio::time::timeout(self.timeout, self.client.complete(&messages)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("LLM call failed: {}", e);
                return Err(ChatSqlError::translation(e.to_string()));
            }
            Err(_) => {
                warn!("LLM call timed out after {:?}", self.timeout);
                return Err(ChatSqlError::translation(format!(
                    "o modelo não respondeu em {} segundos",
                    self.timeout.as_secs_f64()
                )));
            }
        };

        let Some(sql) = self.extraction.apply(&raw) else {
            warn!("No SQL found in LLM answer: {}", raw);
            return Err(ChatSqlError::translation(
                "nenhuma query SQL encontrada na resposta do modelo",
            ));
        };

        if !starts_with_select(&sql) {
            warn!("Extracted statement is not a SELECT: {}", sql);
            return Err(ChatSqlError::translation(format!(
                "a resposta do modelo não é uma consulta SELECT: {sql}"
            )));
        }

        info!("Translated question into: {}", sql);
        debug!("Raw LLM answer: {}", raw);
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::schema::TableDescriptor;

    fn schema() -> Arc<SchemaDescriptor> {
        Arc::new(SchemaDescriptor {
            tables: vec![TableDescriptor {
                name: "clientes".to_string(),
                description: String::new(),
                columns: vec!["id".to_string(), "nome".to_string()],
                relationships: vec![],
            }],
        })
    }

    fn translator(client: MockLlmClient) -> Translator {
        Translator::new(Arc::new(client), schema())
    }

    #[tokio::test]
    async fn test_translate_extracts_fenced_select() {
        let sql = translator(MockLlmClient::new())
            .translate("Liste os clientes")
            .await
            .unwrap();
        assert_eq!(sql, "SELECT * FROM clientes;");
    }

    #[tokio::test]
    async fn test_translate_rejects_delete() {
        let err = translator(MockLlmClient::new())
            .translate("Apague o cliente 1")
            .await
            .unwrap_err();

        assert!(matches!(err, ChatSqlError::Translation(_)));
        assert!(err.to_string().starts_with("Erro na tradução da pergunta"));
        assert!(!starts_with_select(&err.to_string()));
    }

    #[tokio::test]
    async fn test_translate_without_fence_fails_in_fenced_mode() {
        let client = MockLlmClient::new().with_response("total", "SELECT SUM(valor) FROM caixas");
        let err = translator(client).translate("Qual o total?").await.unwrap_err();
        assert!(err.to_string().contains("nenhuma query SQL encontrada"));
    }

    #[tokio::test]
    async fn test_translate_loose_mode_accepts_bare_sql() {
        let client = MockLlmClient::new().with_response("total", "SELECT SUM(valor) FROM caixas");
        let sql = translator(client)
            .with_extraction(ExtractionMode::Loose)
            .translate("Qual o total?")
            .await
            .unwrap();
        assert_eq!(sql, "SELECT SUM(valor) FROM caixas");
    }

    #[tokio::test]
    async fn test_translate_llm_failure() {
        let err = translator(MockLlmClient::new().failing("Rate limited"))
            .translate("Liste os clientes")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatSqlError::Translation(_)));
        assert!(err.to_string().contains("Rate limited"));
    }

    #[tokio::test]
    async fn test_translate_timeout() {
        let client = MockLlmClient::new().with_delay(Duration::from_millis(500));
        let err = translator(client)
            .with_timeout(Duration::from_millis(20))
            .translate("Liste os clientes")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatSqlError::Translation(_)));
        assert!(err.to_string().contains("não respondeu"));
    }

    #[test]
    fn test_from_config_mock() {
        let config = LlmConfig {
            provider: crate::llm::LlmProvider::Mock,
            extraction: ExtractionMode::Loose,
            timeout_secs: 5,
            ..Default::default()
        };
        let translator = Translator::from_config(&config, schema()).unwrap();
        assert_eq!(translator.extraction, ExtractionMode::Loose);
        assert_eq!(translator.timeout, Duration::from_secs(5));
    }
}
