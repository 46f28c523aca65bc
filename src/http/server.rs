//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the cross-cutting pipeline (correlation, errors, logging, limits)
//! - Bind server to listener
//! - Stop gracefully on the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::entities::{setup_entities_router, EntitiesState, EntityStore};
use crate::error::normalizer::route_not_found;
use crate::http::pipeline::{self, PipelineState};
use crate::observability::LogSink;

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server writing structured logs to `sink`.
    pub fn new(config: AppConfig, sink: Arc<dyn LogSink>) -> Self {
        let state = PipelineState::new(sink, &config);
        let router = Self::build_router(&config, &state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: &PipelineState) -> Router {
        let entities = EntitiesState {
            store: EntityStore::new(),
            logger: state.logger.scoped("EntityService"),
        };

        let routes = Router::new()
            .route("/health", get(health))
            .merge(setup_entities_router(entities))
            .fallback(route_not_found);

        pipeline::apply(routes, state, config)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
