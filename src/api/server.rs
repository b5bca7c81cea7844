//! HTTP server lifecycle.
//!
//! Binds the configured address, mounts `api_router()`, and runs axum
//! in a background task. The returned handle carries the bound address
//! and a shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::chatbot::ChatbotClient;
use crate::core_state::CoreState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Signal the server to stop accepting connections and drain.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Bind and start the API server in a background task.
pub async fn start_server(
    core: Arc<CoreState>,
    chatbot: Arc<dyn ChatbotClient>,
) -> Result<ApiServer, ServerError> {
    let bind = format!("{}:{}", core.config.bind_addr, core.config.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.clone(),
            source,
        })?;
    let addr = listener.local_addr().map_err(|source| ServerError::Bind {
        addr: bind,
        source,
    })?;

    let app = api_router(core, chatbot);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::MockChatbotClient;
    use crate::config::ServerConfig;

    async fn start_test_server() -> (ApiServer, tempfile::TempDir) {
        let uploads = tempfile::tempdir().unwrap();
        // Port 0 picks an ephemeral port
        let config = ServerConfig::for_tests(uploads.path().to_path_buf());
        let core = Arc::new(CoreState::in_memory(config).unwrap());
        let server = start_server(core, Arc::new(MockChatbotClient::replying("ok")))
            .await
            .expect("server should start");
        (server, uploads)
    }

    #[tokio::test]
    async fn serves_public_root_and_guards_api() {
        let (mut server, _uploads) = start_test_server().await;
        assert!(server.addr.port() > 0);

        let base = format!("http://{}", server.addr);
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = reqwest::get(format!("{base}/api/appointments")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = reqwest::get(format!("{base}/nonexistent")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (mut server, _uploads) = start_test_server().await;
        server.shutdown();
        server.shutdown();
    }
}
