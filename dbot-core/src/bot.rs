//! Remote bot-API abstraction.
//!
//! [`BotApi`] covers the calls the dispatch layer needs (identity, webhook management, long polling);
//! [`TelegramBot`] implements it via teloxide. Tests substitute a recording implementation.

use crate::error::{DbotError, Result};
use crate::types::{BotIdentity, UpdateKind, UpdatesRequest, WebhookRegistration, WebhookStatus};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::payloads::{DeleteWebhookSetters, GetUpdatesSetters, SetWebhookSetters};
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, Update};

/// Outbound calls to the remote bot API. Wire format and transport belong to the implementation.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Returns the bot account behind the token (`getMe`).
    async fn get_me(&self) -> Result<BotIdentity>;
    /// Registers (or re-asserts) the webhook (`setWebhook`).
    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<()>;
    /// Removes any registered webhook (`deleteWebhook`).
    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()>;
    /// Returns the webhook currently registered on the remote side (`getWebhookInfo`).
    async fn get_webhook_info(&self) -> Result<WebhookStatus>;
    /// Long-polls for the next batch of updates (`getUpdates`).
    async fn get_updates(&self, request: &UpdatesRequest) -> Result<Vec<Update>>;
}

/// Teloxide-based implementation of [`BotApi`].
#[derive(Clone)]
pub struct TelegramBot {
    bot: teloxide::Bot,
}

fn allowed_updates(kinds: &[UpdateKind]) -> Vec<AllowedUpdate> {
    kinds.iter().map(|k| k.to_allowed_update()).collect()
}

/// Parses the optional API server URL (TELEGRAM_API_URL). Used by [`TelegramBot::with_api_url`].
pub fn parse_api_url(s: &str) -> Result<Url> {
    Url::parse(s).map_err(|e| DbotError::Config(format!("Invalid bot API url {}: {}", s, e)))
}

impl TelegramBot {
    /// Creates a client using the given bot token and the default API server.
    pub fn new(token: String) -> Self {
        Self {
            bot: teloxide::Bot::new(token),
        }
    }

    /// Creates a client talking to a custom API server (local bot-API server, test doubles).
    pub fn with_api_url(token: String, api_url: &str) -> Result<Self> {
        let url = parse_api_url(api_url)?;
        Ok(Self {
            bot: teloxide::Bot::new(token).set_api_url(url),
        })
    }

    /// Returns the underlying teloxide::Bot for sending replies from handlers.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl BotApi for TelegramBot {
    async fn get_me(&self) -> Result<BotIdentity> {
        let me = self.bot.get_me().await?;
        Ok(BotIdentity {
            id: me.user.id.0,
            username: me.user.username.clone(),
            first_name: me.user.first_name.clone(),
        })
    }

    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<()> {
        let mut request = self
            .bot
            .set_webhook(registration.url.clone())
            .allowed_updates(allowed_updates(&registration.allowed_updates))
            .drop_pending_updates(registration.drop_pending_updates);
        if let Some(secret) = &registration.secret_token {
            request = request.secret_token(secret.clone());
        }
        request.await?;
        Ok(())
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        self.bot
            .delete_webhook()
            .drop_pending_updates(drop_pending_updates)
            .await?;
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookStatus> {
        let info = self.bot.get_webhook_info().await?;
        Ok(WebhookStatus {
            url: info.url,
            pending_update_count: info.pending_update_count,
            last_error_message: info.last_error_message,
        })
    }

    async fn get_updates(&self, request: &UpdatesRequest) -> Result<Vec<Update>> {
        let mut call = self
            .bot
            .get_updates()
            .timeout(request.timeout_secs)
            .allowed_updates(allowed_updates(&request.allowed_updates));
        if let Some(offset) = request.offset {
            call = call.offset(offset);
        }
        Ok(call.await?)
    }
}
