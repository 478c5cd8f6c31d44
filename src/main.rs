use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws_clients;
mod captions;
mod config;
mod cors;
mod domain;
mod errors;
mod handlers;
mod models;
mod repositories;
mod routes;
mod service;
mod startup;
mod storage;
#[cfg(test)]
mod testing;

use crate::captions::GeminiCaptioner;
use crate::config::Config;
use crate::cors::OriginPolicy;
use crate::domain::CaptionModel;
use crate::errors::AppError;
use crate::repositories::DynamoDbMemeRepository;
use crate::service::MemeService;
use crate::storage::S3MediaStore;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub service: MemeService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memestream=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(bind_address = %config.bind_address, "Configuration loaded");

    // --- AWS Client Initialization ---
    let sdk_config = aws_clients::create_sdk_config(&config).await;
    let db_client = aws_clients::create_dynamodb_client(&sdk_config);
    let s3_client = aws_clients::create_s3_client(&sdk_config);

    // Ensure backing resources exist; tolerated when they already do.
    startup::init_resources(
        &db_client,
        &s3_client,
        &config.memes_table_name,
        &config.media_bucket_name,
        &config.aws_region,
    )
    .await?;

    // --- Adapters and orchestration ---
    let repo = Arc::new(DynamoDbMemeRepository::new(
        db_client,
        config.memes_table_name.clone(),
    ));
    let media = Arc::new(S3MediaStore::new(
        s3_client,
        config.media_bucket_name.clone(),
        config.media_base_url(),
    ));
    let captioner: Option<Arc<dyn CaptionModel>> = match &config.gemini_api_key {
        Some(key) => {
            tracing::info!("Gemini captioner configured");
            Some(Arc::new(GeminiCaptioner::new(key.clone())))
        }
        None => {
            tracing::info!("No Gemini API key configured, caption requests use the static fallback");
            None
        }
    };

    let state = Arc::new(AppState {
        service: MemeService::new(repo, media, captioner),
    });

    let cors = OriginPolicy::new(config.allowed_origins.clone(), config.cors_mode);
    let app = routes::create_router(state, &cors);

    // --- Server Startup ---
    tracing::info!("MemeStream server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
