//! REST exposure for the hub
//!
//! The hub's HTTP surface is deliberately small: liveness endpoints for load
//! balancers and orchestrators, plus any custom routes the embedder adds.

use super::super::host::ServerHost;
use anyhow::Result;
use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// # Arguments
    ///
    /// * `host` - The server host containing the shared registry
    /// * `custom_routes` - Additional custom routes to merge
    ///
    /// # Returns
    ///
    /// Returns an Axum router with:
    /// - Health check routes (`/health`, `/healthz`)
    /// - Custom routes
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut app = Self::health_routes(host);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app)
    }

    /// Build health check routes
    fn health_routes(host: Arc<ServerHost>) -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
            .with_state(host)
    }

    /// Health check endpoint handler
    async fn health_check(State(host): State<Arc<ServerHost>>) -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "hub-rs",
            "connections": host.manager.connection_count().await,
        }))
    }
}
