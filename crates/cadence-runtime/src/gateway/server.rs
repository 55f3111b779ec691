use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cadence_core::config::GatewayConfig;
use cadence_core::{CadenceError, Result};

use super::handlers::{
    create_instance, get_instance, health_handler, list_instances, override_step,
    pause_instance, resume_instance, run_sweep, transition_step, GatewayState,
};
use crate::Engine;

/// HTTP front of the engine API.
pub struct GatewayServer {
    config: GatewayConfig,
    engine: Arc<Engine>,
    log_requests: bool,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            log_requests: true,
        }
    }

    /// Toggle the per-request trace layer.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Build the router; `shutdown` also cancels sweeps started over HTTP.
    pub fn router(&self, shutdown: CancellationToken) -> Router {
        let state = GatewayState {
            engine: self.engine.clone(),
            shutdown,
        };

        let cors = if self.config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/instances", get(list_instances).post(create_instance))
            .route("/instances/{id}", get(get_instance))
            .route("/instances/{id}/pause", post(pause_instance))
            .route("/instances/{id}/resume", post(resume_instance))
            .route(
                "/instances/{id}/steps/{step_id}/transition",
                post(transition_step),
            )
            .route("/instances/{id}/steps/{step_id}/override", post(override_step))
            .route("/sweep", post(run_sweep))
            .with_state(state)
            .layer(ServiceBuilder::new().layer(cors));

        if self.log_requests {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        }
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| {
                CadenceError::Config(format!(
                    "invalid gateway address {}:{}: {}",
                    self.config.host, self.config.port, e
                ))
            })
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.addr()?;
        let router = self.router(shutdown.clone());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CadenceError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        tracing::info!("Gateway listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| CadenceError::Internal(format!("Gateway server error: {}", e)))
    }
}
