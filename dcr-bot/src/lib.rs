//! dcr-bot library interface
//!
//! Exposes the relay, its collaborators and the HTTP router for integration
//! testing; `main.rs` only wires them together.

pub mod api;
pub mod archive;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod relay;
pub mod transport;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use relay::Relay;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Event handlers and their batch store
    pub relay: Arc<Relay>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Dispatches started by the webhook, drained on shutdown
    pub tasks: TaskTracker,
    /// Username from getMe; commands addressed to another bot are ignored
    pub bot_username: Option<String>,
}

impl AppState {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            startup_time: Utc::now(),
            tasks: TaskTracker::new(),
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }
}

/// Stop accepting tracked work and wait up to `grace` for what is running
///
/// Returns `false` if tasks were still running when `grace` ran out.
pub async fn drain_background_tasks(tasks: &TaskTracker, grace: Duration) -> bool {
    tasks.close();
    tokio::time::timeout(grace, tasks.wait()).await.is_ok()
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::webhook_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
