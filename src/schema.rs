//! Schema descriptor used as prompt context.
//!
//! The descriptor is a hand-written description of the tables the model may
//! query. It is loaded once at startup and shared read-only.

use crate::error::{ChatSqlError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema bundled with the binary.
const DEFAULT_SCHEMA: &str = include_str!("../schema/default.toml");

/// Ordered list of table descriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(default)]
    pub tables: Vec<TableDescriptor>,
}

/// One table of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Join hint between two tables, e.g. `clientes.id = os.cliente_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The related table.
    pub table: String,

    /// The join condition.
    pub on: String,
}

impl SchemaDescriptor {
    /// Returns the schema bundled with the binary.
    pub fn bundled() -> Result<Self> {
        Self::parse_toml(DEFAULT_SCHEMA, Path::new("schema/default.toml"))
    }

    /// Loads a schema from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatSqlError::config(format!(
                "Failed to read schema file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_toml(&content, path)
    }

    /// Loads from `path` when given, otherwise the bundled schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::bundled(),
        }
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let schema: Self = toml::from_str(content).map_err(|e| {
            ChatSqlError::config(format!("Schema error in {}:\n  {}", path.display(), e))
        })?;

        if schema.tables.is_empty() {
            return Err(ChatSqlError::config(format!(
                "Schema {} describes no tables",
                path.display()
            )));
        }

        Ok(schema)
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_llm(&self) -> String {
        self.tables
            .iter()
            .map(format_table_for_llm)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_table_for_llm(table: &TableDescriptor) -> String {
    let mut text = format!("Table: {}\n", table.name);

    if !table.description.is_empty() {
        text.push_str(&format!("  Description: {}\n", table.description));
    }

    text.push_str(&format!("  Columns: {}\n", table.columns.join(", ")));

    if !table.relationships.is_empty() {
        text.push_str("  Relationships:\n");
        for rel in &table.relationships {
            text.push_str(&format!("    - {}: {}\n", rel.table, rel.on));
        }
    }

    text
}
