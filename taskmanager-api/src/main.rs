//! # Task Manager API Server
//!
//! REST backend for users, projects, memberships, tasks and subtasks.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskmanager-api
//! ```
//!
//! Configuration is read from the environment (and `.env`); see
//! [`taskmanager_api::config::Config`]. Set `LOG_FORMAT=json` for JSON logs.

use std::sync::Arc;

use anyhow::Context;
use taskmanager_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskmanager_shared::{
    db::{
        migrations::{run_migrations, schema_version},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    email::{EmailSender, HttpEmailSender, LogEmailSender},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "taskmanager_api=debug,taskmanager_shared=debug,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn EmailSender>> {
    if !config.mail_delivery_enabled() {
        tracing::warn!("MAIL_API_URL/MAIL_API_TOKEN not set, emails will only be logged");
        return Ok(Arc::new(LogEmailSender));
    }

    let api_url = config.mail.api_url.as_deref().unwrap_or_default();
    let api_token = config.mail.api_token.as_deref().unwrap_or_default();
    let sender = HttpEmailSender::new(api_url, api_token, config.mail.from.as_str())
        .context("Failed to build mail client")?;

    tracing::info!(api_url = %api_url, "Mail delivery enabled");
    Ok(Arc::new(sender))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Task Manager API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db_config = DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::new(config.database.url.clone())
    };
    let pool = match create_pool(db_config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Could not connect to the database");
            std::process::exit(1);
        }
    };

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    if let Ok(Some(version)) = schema_version(&pool).await {
        tracing::info!(version, "Database schema version");
    }

    let mailer = build_mailer(&config)?;
    let address = config.bind_address();

    let state = AppState::new(pool.clone(), config, mailer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
