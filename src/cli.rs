//! Command-line argument parsing for chatsql.

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::error::{ChatSqlError, Result};
use crate::llm::LlmProvider;
use crate::logging;
use clap::Parser;
use std::path::PathBuf;

/// Ask questions in plain language, get read-only SQL answers as HTML tables.
#[derive(Parser, Debug)]
#[command(name = "chatsql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// LLM provider to use (openai, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Use mock database (canned rows, for local runs)
    #[arg(long)]
    pub mock_db: bool,

    /// Schema description file (TOML)
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Append logs to a file (default: logs/chatsql.log)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the log file requested on the command line, if any.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .map(|path| path.unwrap_or_else(logging::default_log_path))
    }

    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider
                .parse::<LlmProvider>()
                .map_err(ChatSqlError::config)?;
        }
        if self.mock_db {
            config.database.backend = DatabaseBackend::Mock;
        }
        if let Some(schema) = &self.schema {
            config.schema_path = Some(schema.clone());
        }
        if let Some(log_file) = self.log_file() {
            config.logging.file = Some(log_file);
        }
        Ok(())
    }
}
