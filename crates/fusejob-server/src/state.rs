//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use fusejob_engine::Dispatcher;

use crate::config::ServerConfig;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Routes requests to the harness.
    pub dispatcher: Arc<Dispatcher>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Held for the duration of a job; one job occupies the harness.
    pub job_gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
            job_gate: Arc::new(Mutex::new(())),
        }
    }
}
