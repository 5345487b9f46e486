//! Webhook receiver
//!
//! Telegram POSTs each update here. The update is decoded, turned into an
//! [`InboundEvent`] and handed to the relay on a task tracked by
//! [`AppState::tasks`], so the request is acknowledged before any download
//! or conversion starts and shutdown can wait for it. Updates the relay does
//! not react to are acknowledged and dropped.

use axum::{body::Bytes, extract::State, routing::post, Router};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::transport::{InboundEvent, Update};
use crate::AppState;

/// POST /webhook
pub async fn receive_update(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    let update: Update = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected malformed update");
        ApiError::BadRequest(format!("malformed update: {}", e))
    })?;

    match InboundEvent::from_update(&update, state.bot_username.as_deref()) {
        Some(event) => {
            let relay = state.relay.clone();
            state.tasks.spawn(async move {
                relay.dispatch(event).await;
            });
        }
        None => debug!(update_id = update.update_id, "Ignoring update"),
    }

    Ok("OK")
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_update))
}
