mod chat;
mod config;
mod db;
mod error;
mod server;

use crate::chat::{ChatPipeline, OpenAiCompletion, PipelineSettings};
use crate::config::Config;
use anyhow::{Context, Result};
use openai_client::OpenAiClient;
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize variables
    let log_level = config.log_level();
    let log_dir = &config.logging.dir;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(log_dir)?;

    // Setup file appender (daily rotation)
    let file_appender = tracing_appender::rolling::daily(log_dir, "axom.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Use local time for log timestamps
    let local_timer = ChronoLocal::rfc_3339();

    // Setup stdout layer with local time
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_timer(local_timer.clone());

    // Setup file layer with local time
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(local_timer)
        .with_writer(non_blocking);

    // Filter layer based on config
    let filter_layer = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive("sqlx=warn".parse()?)
        .add_directive("sea_orm=warn".parse()?)
        .add_directive("tower_http=info".parse()?);

    // Combine layers
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Starting AXOM chat service...");
    info!("Logs are written to: {}", log_dir);

    // SQLite needs the parent directory of the database file
    ensure_sqlite_dir(&config.database.url)?;

    // Connect to database
    let db = db::establish_connection(&config.database.url).await?;
    info!("Database connection established");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    info!("✅ Database migrations completed");

    // Initialize repository
    let repo = Arc::new(db::repo::Repo::new(db));

    // Test database connection
    repo.ping().await?;
    info!("✅ Database ping successful");

    // Initialize completion client
    let client = OpenAiClient::new(
        &config.openai.api_base,
        config.openai.api_key.clone(),
        config.openai.timeout(),
    )?;
    info!(
        "✅ Completion client initialized ({}, model {})",
        client.endpoint(),
        config.openai.model
    );
    let completion = Arc::new(OpenAiCompletion::new(client, config.openai.model.clone()));

    let pipeline = Arc::new(ChatPipeline::new(
        repo.clone(),
        completion,
        PipelineSettings::from(&config.chat),
    ));

    let state = server::AppState { pipeline, repo };

    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    server::serve(listener, state).await?;

    info!("✅ Shutdown complete");
    Ok(())
}

fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };

    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    Ok(())
}
