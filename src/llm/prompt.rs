//! Prompt construction for LLM requests.
//!
//! Builds the system prompt with the schema descriptor and wraps the question
//! in a user message.

use crate::llm::types::Message;
use crate::schema::SchemaDescriptor;

/// System prompt template for the SQL assistant.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"Você é um assistente que converte perguntas em linguagem natural para queries SQL do MySQL, usando o schema do banco de dados abaixo.

SCHEMA DAS TABELAS:
{schema}

INSTRUÇÕES:
- Gere somente SQL válido para MySQL.
- Gere somente consultas de leitura: uma única instrução SELECT.
- Nunca use DELETE, UPDATE, DROP, INSERT, ALTER, TRUNCATE, GRANT ou REVOKE.
- Entenda o schema das tabelas e os relacionamentos antes de gerar a consulta.
- Use os relacionamentos listados para os JOINs.
- Escolha o agrupamento de dados adequado para responder à pergunta.

FORMATO DA RESPOSTA:
Retorne a query SQL dentro de um bloco ```sql ... ```, por exemplo:
```sql
SELECT d.nome AS departamento, COUNT(os.id) AS quantidade FROM os JOIN departamentos d ON os.departamento_id = d.id WHERE os.paga = 1 GROUP BY d.nome ORDER BY quantidade DESC;
```
Se precisar explicar algo, faça isso antes ou depois do bloco."#;

/// Builds the system prompt with the schema injected.
pub fn build_system_prompt(schema: &SchemaDescriptor) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{schema}", &schema.format_for_llm())
}

/// Builds the user message carrying the question.
pub fn build_user_message(question: &str) -> String {
    format!("Pergunta: {question}")
}

/// Builds the complete message list for one translation request.
pub fn build_messages(schema: &SchemaDescriptor, question: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(schema)),
        Message::user(build_user_message(question)),
    ]
}
