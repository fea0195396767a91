//! Core types: update kinds, bot identity, webhook status and the outbound request shapes.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use teloxide::types::{AllowedUpdate, Update, UpdateKind as TgUpdateKind};

use crate::error::DbotError;

/// Category of an inbound update. Exactly one payload per update corresponds to its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
    Poll,
    PollAnswer,
    MyChatMember,
    ChatMember,
    ChatJoinRequest,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 14] = [
        UpdateKind::Message,
        UpdateKind::EditedMessage,
        UpdateKind::ChannelPost,
        UpdateKind::EditedChannelPost,
        UpdateKind::InlineQuery,
        UpdateKind::ChosenInlineResult,
        UpdateKind::CallbackQuery,
        UpdateKind::ShippingQuery,
        UpdateKind::PreCheckoutQuery,
        UpdateKind::Poll,
        UpdateKind::PollAnswer,
        UpdateKind::MyChatMember,
        UpdateKind::ChatMember,
        UpdateKind::ChatJoinRequest,
    ];

    /// Kind of a teloxide update; `None` for kinds outside this set (treated as unhandled).
    pub fn of(update: &Update) -> Option<Self> {
        let kind = match &update.kind {
            TgUpdateKind::Message(_) => UpdateKind::Message,
            TgUpdateKind::EditedMessage(_) => UpdateKind::EditedMessage,
            TgUpdateKind::ChannelPost(_) => UpdateKind::ChannelPost,
            TgUpdateKind::EditedChannelPost(_) => UpdateKind::EditedChannelPost,
            TgUpdateKind::InlineQuery(_) => UpdateKind::InlineQuery,
            TgUpdateKind::ChosenInlineResult(_) => UpdateKind::ChosenInlineResult,
            TgUpdateKind::CallbackQuery(_) => UpdateKind::CallbackQuery,
            TgUpdateKind::ShippingQuery(_) => UpdateKind::ShippingQuery,
            TgUpdateKind::PreCheckoutQuery(_) => UpdateKind::PreCheckoutQuery,
            TgUpdateKind::Poll(_) => UpdateKind::Poll,
            TgUpdateKind::PollAnswer(_) => UpdateKind::PollAnswer,
            TgUpdateKind::MyChatMember(_) => UpdateKind::MyChatMember,
            TgUpdateKind::ChatMember(_) => UpdateKind::ChatMember,
            TgUpdateKind::ChatJoinRequest(_) => UpdateKind::ChatJoinRequest,
            _ => return None,
        };
        Some(kind)
    }

    /// PascalCase tag, e.g. `CallbackQuery`.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Message => "Message",
            UpdateKind::EditedMessage => "EditedMessage",
            UpdateKind::ChannelPost => "ChannelPost",
            UpdateKind::EditedChannelPost => "EditedChannelPost",
            UpdateKind::InlineQuery => "InlineQuery",
            UpdateKind::ChosenInlineResult => "ChosenInlineResult",
            UpdateKind::CallbackQuery => "CallbackQuery",
            UpdateKind::ShippingQuery => "ShippingQuery",
            UpdateKind::PreCheckoutQuery => "PreCheckoutQuery",
            UpdateKind::Poll => "Poll",
            UpdateKind::PollAnswer => "PollAnswer",
            UpdateKind::MyChatMember => "MyChatMember",
            UpdateKind::ChatMember => "ChatMember",
            UpdateKind::ChatJoinRequest => "ChatJoinRequest",
        }
    }

    /// Name used by the bot API in `allowed_updates` and in update payloads, e.g. `callback_query`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::EditedMessage => "edited_message",
            UpdateKind::ChannelPost => "channel_post",
            UpdateKind::EditedChannelPost => "edited_channel_post",
            UpdateKind::InlineQuery => "inline_query",
            UpdateKind::ChosenInlineResult => "chosen_inline_result",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::ShippingQuery => "shipping_query",
            UpdateKind::PreCheckoutQuery => "pre_checkout_query",
            UpdateKind::Poll => "poll",
            UpdateKind::PollAnswer => "poll_answer",
            UpdateKind::MyChatMember => "my_chat_member",
            UpdateKind::ChatMember => "chat_member",
            UpdateKind::ChatJoinRequest => "chat_join_request",
        }
    }

    pub fn to_allowed_update(self) -> AllowedUpdate {
        match self {
            UpdateKind::Message => AllowedUpdate::Message,
            UpdateKind::EditedMessage => AllowedUpdate::EditedMessage,
            UpdateKind::ChannelPost => AllowedUpdate::ChannelPost,
            UpdateKind::EditedChannelPost => AllowedUpdate::EditedChannelPost,
            UpdateKind::InlineQuery => AllowedUpdate::InlineQuery,
            UpdateKind::ChosenInlineResult => AllowedUpdate::ChosenInlineResult,
            UpdateKind::CallbackQuery => AllowedUpdate::CallbackQuery,
            UpdateKind::ShippingQuery => AllowedUpdate::ShippingQuery,
            UpdateKind::PreCheckoutQuery => AllowedUpdate::PreCheckoutQuery,
            UpdateKind::Poll => AllowedUpdate::Poll,
            UpdateKind::PollAnswer => AllowedUpdate::PollAnswer,
            UpdateKind::MyChatMember => AllowedUpdate::MyChatMember,
            UpdateKind::ChatMember => AllowedUpdate::ChatMember,
            UpdateKind::ChatJoinRequest => AllowedUpdate::ChatJoinRequest,
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = DbotError;

    /// Accepts the PascalCase tag (`CallbackQuery`) or the wire name (`callback_query`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        UpdateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.wire_name() == s)
            .ok_or_else(|| DbotError::UnknownUpdateKind(s.to_string()))
    }
}

/// Identity of the bot account as reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: u64,
    pub username: Option<String>,
    pub first_name: String,
}

/// Webhook currently registered on the remote side (`getWebhookInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookStatus {
    /// `None` when no webhook is registered.
    pub url: Option<Url>,
    pub pending_update_count: u32,
    pub last_error_message: Option<String>,
}

/// Parameters of a `setWebhook` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub url: Url,
    pub allowed_updates: Vec<UpdateKind>,
    pub secret_token: Option<String>,
    pub drop_pending_updates: bool,
}

/// Parameters of a `getUpdates` long-poll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatesRequest {
    /// Identifier of the first update to return; `None` on the first call.
    pub offset: Option<i32>,
    /// Long-poll timeout in seconds.
    pub timeout_secs: u32,
    pub allowed_updates: Vec<UpdateKind>,
}

/// Offset that acknowledges `update` in the next `getUpdates` call. Ids beyond the `i32` range
/// saturate at `i32::MAX`.
pub fn next_offset(update: &Update) -> i32 {
    i32::try_from(update.id.0)
        .unwrap_or(i32::MAX)
        .saturating_add(1)
}
