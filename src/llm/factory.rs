//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{ChatSqlError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the configured provider.
///
/// The API key must already be resolved into `config` (see
/// [`crate::config::Config::apply_env_defaults`]).
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider {
        LlmProvider::OpenAi => {
            let key = config.api_key.clone().ok_or_else(|| {
                ChatSqlError::llm("No API key configured. Set [llm].api_key or OPENAI_API_KEY.")
            })?;
            let mut openai = OpenAiConfig::new(key, config.model.clone())
                .with_temperature(config.temperature)
                .with_timeout(config.timeout_secs);
            if let Some(base_url) = &config.base_url {
                openai = openai.with_base_url(base_url.clone());
            }
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
