//! Axum-based HTTP server that fronts the site with prefix resolution.

use axum::{
    extract::Extension,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use prefixgate_core::{AppConfig, Result};

use crate::middleware::{prefix_middleware, PrefixState, RequestPrefix};
use crate::resolver::PathPrefixResolver;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
    /// Redirect canonical paths without a trailing slash.
    pub enforce_trailing_slash: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: false,
            enable_tracing: true,
            enforce_trailing_slash: true,
        }
    }
}

impl From<&AppConfig> for GatewayConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            enable_cors: config.http.enable_cors,
            enable_tracing: config.http.enable_tracing,
            enforce_trailing_slash: config.http.enforce_trailing_slash,
        }
    }
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    resolver: Arc<PathPrefixResolver>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, resolver: PathPrefixResolver) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    ///
    /// `/__health` and `/__metrics` are answered directly. Every other path
    /// goes through [`prefix_middleware`] first.
    pub fn build_router(&self) -> Router {
        let state = PrefixState::new(self.resolver.clone())
            .with_trailing_slash(self.config.enforce_trailing_slash);

        let site = Router::new()
            .fallback(resolved_prefix_handler)
            .layer(middleware::from_fn_with_state(state, prefix_middleware));

        let mut router = Router::new().route("/__health", get(health_handler));

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/__metrics", get(move || async move { handle.render() }));
        }

        router = router.fallback_service(site);

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| prefixgate_core::Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| prefixgate_core::Error::gateway(format!("Server error: {}", e)))?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Stands in for the page renderer: reports the prefix it was handed.
async fn resolved_prefix_handler(Extension(prefix): Extension<RequestPrefix>) -> Json<RequestPrefix> {
    Json(prefix)
}
