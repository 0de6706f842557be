//! chatsql - ask questions in plain language, get read-only SQL answers.

use std::sync::Arc;

use chatsql::cli::Cli;
use chatsql::config::Config;
use chatsql::error::Result;
use chatsql::llm::Translator;
use chatsql::logging;
use chatsql::query::QueryExecutor;
use chatsql::schema::SchemaDescriptor;
use chatsql::server::{self, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init_stderr_logging();
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    };

    match &config.logging.file {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(config).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

/// Resolves the configuration: file, then environment defaults, then CLI
/// overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_defaults()?;
    cli.apply_to(&mut config)?;
    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    let schema = Arc::new(SchemaDescriptor::load(config.schema_path.as_deref())?);
    info!("Schema loaded: {} tables", schema.tables.len());

    let translator = Translator::from_config(&config.llm, schema)?;
    info!(
        "LLM: {} ({}, extraction: {:?})",
        config.llm.provider, config.llm.model, config.llm.extraction
    );

    let executor = QueryExecutor::from_config(config.safety.mode.build(), &config.database);
    info!(
        "Database: {} ({}), safety gate: {:?}",
        config.database.display_string(),
        config.database.backend.as_str(),
        config.safety.mode
    );

    let state = Arc::new(AppState::new(translator, executor));
    server::serve(&config.server, state).await
}
