//! HTTP server

pub mod error;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use depscan_analyzer::Analyzer;
use tokio::net::TcpListener;

pub use error::ApiError;
pub use router::create_router;

/// State shared by every handler.
pub struct ServerState {
    pub analyzer: Arc<Analyzer>,
}

impl ServerState {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub struct DepscanServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl DepscanServer {
    pub fn new(analyzer: Analyzer, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(Arc::new(analyzer))),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Serve until Ctrl-C, then drain the analyzer.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        let router = create_router(Arc::clone(&self.state));
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Shutting down waits for an in-flight run, so keep it off the runtime.
        let analyzer = Arc::clone(&self.state.analyzer);
        tokio::task::spawn_blocking(move || analyzer.shutdown()).await?;
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
