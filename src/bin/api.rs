use finance_chat::{api::start_server, config::Settings, conversation::TurnController};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load(None)?;

    if settings.model.api_key.is_empty() {
        eprintln!("⚠️  AZURE_OPENAI_API_KEY not set in config.txt or .env");
    }

    info!("🚀 Finance Chat - API Server");
    info!("📍 Port: {}", settings.api_port);

    let controller = Arc::new(TurnController::from_settings(&settings)?);

    info!("✅ Turn controller initialized");
    info!("📡 Starting API server...");

    start_server(controller, settings.api_port).await?;

    Ok(())
}
