use financial_insight::{api::start_server, config::AppConfig};
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

    // Loads .env before reading variables
    let config = AppConfig::from_env()?;

    if !config.chat_enabled() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env; the chat endpoint will report the feature as unavailable");
    }

    info!("🚀 Financial Insight - API Server");
    info!("📍 Port: {}", config.port);
    info!("📄 Sample data: {}", config.sample_data_path.display());

    start_server(config).await?;

    Ok(())
}
