//! # dbot-telegram
//!
//! Telegram delivery layer: config, long-polling loop, webhook lifecycle coordinator, webhook HTTP
//! routes, health probe, and the runner that picks a delivery mode. Updates from either transport go
//! through the same [`update_router::UpdateRouter`].

mod config;
mod health;
mod polling;
mod routes;
mod runner;
mod webhook;

pub use config::{
    DeliveryMode, TelegramConfig, WebhookSettings, DEFAULT_POLLING_INTERVAL_SECS,
    DEFAULT_POLLING_TIMEOUT_SECS, DEFAULT_WEBHOOK_LISTEN_ADDR, DEFAULT_WEBHOOK_REFRESH_INTERVAL_SECS,
    DEFAULT_WEBHOOK_ROUTE,
};
pub use health::{probe, HealthReport, HealthStatus};
pub use polling::{run_polling, PollingSettings};
pub use routes::{build_router, WebhookState, SECRET_HEADER};
pub use runner::{run_bot, run_with_api};
pub use webhook::WebhookCoordinator;
