//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{ChatSqlError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for local runs and tests without making real API calls.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// When set, every call fails with this message.
    failure: Option<String>,
    /// Artificial latency before answering.
    delay: Option<Duration>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes every call fail with an LLM error.
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.failure = Some(msg.into());
        self
    }

    /// Waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("apag") || input_lower.contains("delete") {
            return "```sql\nDELETE FROM clientes WHERE id = 1;\n```".to_string();
        }

        if (input_lower.contains("quant") || input_lower.contains("count"))
            && input_lower.contains("os")
        {
            return "```sql\nSELECT COUNT(*) AS quantidade FROM os;\n```".to_string();
        }

        if input_lower.contains("clientes") {
            return "Aqui está a consulta:\n\n```sql\nSELECT * FROM clientes;\n```".to_string();
        }

        "Não consegui entender a pergunta. Pode reformular?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = &self.failure {
            return Err(ChatSqlError::llm(msg.clone()));
        }
        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
