use std::{sync::Arc, time::Duration};

use migration::{Migrator, MigratorTrait};
use receipts::{Extractor, GeminiClient, GeminiConfig};
use server::{AbuseGuard, HttpRateLimiter, ServerState};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledgerscan={level},server={level},engine={level},receipts={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("No server settings found, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;
    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await?;

    let mut state = ServerState::new(engine, db).guard(build_guard(&settings.guard)?);
    if let Some(limit) = server.upload_limit_bytes {
        state = state.upload_limit(limit);
    }
    match settings.extraction {
        Some(extraction) if !extraction.api_key.trim().is_empty() => {
            state = state.extractor(build_extractor(extraction)?);
        }
        _ => tracing::warn!("No extraction settings found, receipt scanning is disabled"),
    }

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(state, listener).await?;

    Ok(())
}

fn build_guard(
    config: &settings::Guard,
) -> Result<AbuseGuard, Box<dyn std::error::Error + Send + Sync>> {
    let guard = AbuseGuard::new().fail_open(config.fail_open);
    let Some(url) = &config.rate_limit_url else {
        return Ok(guard);
    };
    tracing::info!("Rate limiting through {url}");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    Ok(guard.limiter(Arc::new(HttpRateLimiter::new(client, url.clone()))))
}

fn build_extractor(
    config: settings::Extraction,
) -> Result<Extractor, Box<dyn std::error::Error + Send + Sync>> {
    let mut gemini = GeminiConfig::new(config.api_key);
    if let Some(base_url) = config.base_url {
        gemini.base_url = base_url;
    }
    if let Some(timeout) = config.timeout_secs {
        gemini.timeout = Duration::from_secs(timeout);
    }

    let mut extractor = Extractor::new(Arc::new(GeminiClient::new(gemini)?));
    if let Some(model) = config.default_model {
        extractor = extractor.default_model(model);
    }
    if let Some(max) = config.max_candidates {
        extractor = extractor.max_candidates(max);
    }
    tracing::info!("Receipt scanning enabled: {extractor:?}");
    Ok(extractor)
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
