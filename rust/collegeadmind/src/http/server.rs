//! # HTTP Server
//!
//! Combines the session, student and promotion routers behind CORS and
//! request tracing.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::promotion_routes::promotion_routes;
use super::session_routes::session_routes;
use super::state::HttpState;
use super::student_routes::student_routes;
use crate::config::ServerConfig;

pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: HttpState) -> Self {
        let router = Self::build_router(&config, Arc::new(state));
        Self { config, router }
    }

    fn build_router(config: &ServerConfig, state: Arc<HttpState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(health).with_state(state.clone()))
            .nest("/session", session_routes(state.clone()))
            .nest("/student", student_routes(state.clone()))
            .nest("/promotion", promotion_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the router (for testing)
    #[cfg(test)]
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds and serves until the process is stopped.
    ///
    /// Prints `listening on <addr>` to stdout once bound so a parent process
    /// can discover an ephemeral port.
    pub async fn start(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .with_context(|| format!("invalid listen address {}", self.config.socket_addr()))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "http server listening");
        println!("listening on {}", local);

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

async fn health(State(state): State<Arc<HttpState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.to_string_lossy(),
    }))
}
