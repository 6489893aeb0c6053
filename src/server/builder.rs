//! ServerBuilder for fluent API to build the hub server

use super::exposure::{RestExposure, WebSocketExposure};
use super::host::ServerHost;
use crate::config::HubConfig;
use crate::core::error::HubError;
use anyhow::Result;
use axum::Router;
use axum::extract::ws::close_code;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for creating the hub's HTTP + WebSocket server
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(HubConfig::from_env()?)
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: HubConfig,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: HubConfig::default(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Add custom HTTP routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Validate the configuration and build the shared host
    pub fn build_host(&self) -> Result<ServerHost, HubError> {
        self.config.validate()?;
        Ok(ServerHost::new(self.config.clone()))
    }

    /// Build the combined router for an existing host
    ///
    /// Merges the health routes, custom routes and the WebSocket endpoint,
    /// wrapped in a request trace layer.
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let rest_router = RestExposure::build_router(host.clone(), custom_routes)?;
        let ws_router = WebSocketExposure::build_router(host)?;

        Ok(rest_router.merge(ws_router).layer(TraceLayer::new_for_http()))
    }

    /// Build the host and router together
    pub fn build(mut self) -> Result<(Arc<ServerHost>, Router)> {
        let host = Arc::new(self.build_host()?);
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let router = Self::build_router(host.clone(), custom_routes)?;
        Ok((host, router))
    }

    /// Serve on the configured address with graceful shutdown
    ///
    /// This will:
    /// - Bind to `host:port` from the configuration
    /// - Start the liveness monitor
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(HubError::from)?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    ///
    /// On shutdown the heartbeat timer is cancelled first, then every open
    /// connection is asked to close, then the HTTP server drains.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (host, app) = self.build()?;
        let local_addr = listener.local_addr().map_err(HubError::from)?;
        let monitor = WebSocketExposure::spawn_liveness_monitor(&host);

        tracing::info!(
            addr = %local_addr,
            ws_path = %host.config.ws_path,
            "Server listening"
        );

        let manager = host.manager.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                monitor.abort();
                manager
                    .close_all(close_code::AWAY, "Server shutting down")
                    .await;
            })
            .await
            .map_err(HubError::from)?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
