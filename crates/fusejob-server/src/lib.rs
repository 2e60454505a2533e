//! HTTP job dispatch server for fusejob.
//!
//! Exposes the harness over a small JSON API:
//!
//! - `GET /health`: tool and host health
//! - `POST /jobs`: run a job (bare request or `{ "id", "input" }` envelope)
//! - `POST /diagnose`: environment report for fixing the strategy catalog
//!
//! Jobs run one at a time. Request bodies are capped from the configured
//! inline payload limit.
//!
//! # Example
//!
//! ```ignore
//! use fusejob_engine::{Dispatcher, Harness};
//! use fusejob_server::{Server, ServerConfig};
//!
//! let config = fusejob_config::load_config(None)?.config;
//! let dispatcher = Dispatcher::new(Harness::new(config.clone())?);
//! let server = Server::new(dispatcher, ServerConfig::from_config(&config)?);
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fusejob_engine::Dispatcher;

/// The fusejob HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server with the given dispatcher and configuration.
    pub fn new(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(dispatcher, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::job_routes())
            // Replace axum's default 2 MB extractor limit with ours
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.state.config.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
