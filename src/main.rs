use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use medi_server::api::server::start_server;
use medi_server::chatbot::OpenRouterClient;
use medi_server::config::{self, ServerConfig};
use medi_server::core_state::CoreState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env();
    if config.chatbot_api_key.is_empty() {
        tracing::warn!("MEDI_CHATBOT_API_KEY is not set, chatbot requests will fail upstream");
    }

    let chatbot = Arc::new(OpenRouterClient::new(
        &config.chatbot_base_url,
        &config.chatbot_api_key,
        &config.chatbot_model,
    )?);
    let core = Arc::new(CoreState::new(config)?);

    let mut server = start_server(core, chatbot).await?;
    tracing::info!(addr = %server.addr, "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down");
    server.shutdown();

    Ok(())
}
