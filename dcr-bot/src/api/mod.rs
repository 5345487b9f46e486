//! HTTP API handlers for dcr-bot

pub mod health;
pub mod webhook;

pub use health::health_routes;
pub use webhook::webhook_routes;
