mod app;
mod config;
mod error;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docscan_server=info,docscan_ocr=info,tower_http=info".into()),
        )
        .init();

    let config = config::ServerConfig::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create data directory {}", parent.display()))?;
        }
    }

    let db = docscan_storage::create_db(&config.db_path)
        .await
        .with_context(|| format!("open database {}", config.db_path.display()))?;

    let recognizer = config.build_recognizer()?;
    tracing::info!(
        "OCR backend: {:?}, preprocess: {}, rules: {}",
        config.backend,
        config.strategy,
        config.rule_set
    );

    let state = app::AppState::new(db, recognizer, config.strategy, config.rule_set);
    let router = app::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}
