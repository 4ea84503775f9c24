use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use top_tiulim::cache::ContentCache;
use top_tiulim::config::Config;
use top_tiulim::contact::EmailClient;
use top_tiulim::content::ContentService;
use top_tiulim::spreadsheet::HttpSheetSource;
use top_tiulim::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("top_tiulim=info")),
        )
        .init();

    let config = Config::parse();
    let workbook_url = config.workbook_url()?;
    info!("Reading site content from {}", workbook_url);

    let content = ContentService::new(
        Arc::new(HttpSheetSource::new(workbook_url)),
        ContentCache::new(),
    );
    let email = EmailClient::new(
        config.emailjs_api_url.clone(),
        config.emailjs_credentials(),
        config.contact_recipient.clone(),
    );
    if !email.is_configured() {
        info!("EmailJS not configured, contact messages will only be logged");
    }

    let state = AppState {
        content: content.clone(),
        email,
        public_dir: config.public_dir.clone(),
    };
    let app = create_app(state);

    // Bind before preloading: the default workbook is served by this process.
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Bind {}", config.listen))?;
    info!("listening on {}", listener.local_addr()?);

    if config.preload {
        tokio::spawn(async move {
            let loaded = content.preload().await;
            info!(
                "Preloaded {} of 3 collections, {} images",
                loaded.collections, loaded.images
            );
        });
    }

    axum::serve(listener, app).await.context("Serve")?;
    Ok(())
}
