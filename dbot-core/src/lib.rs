//! # dbot-core
//!
//! Core types and traits for the bot layer: [`UpdateKind`], the remote [`BotApi`] and its teloxide
//! implementation [`TelegramBot`], [`DbotError`], and tracing initialization. Used by update-router and dbot-telegram.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{parse_api_url, BotApi, TelegramBot};
pub use error::{DbotError, LifecycleError, Result};
pub use logger::init_tracing;
pub use types::{
    next_offset, BotIdentity, UpdateKind, UpdatesRequest, WebhookRegistration, WebhookStatus,
};

/// Re-exported so downstream crates name the same update type as the client library.
pub use teloxide::types::Update;
