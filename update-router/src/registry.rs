//! Explicit per-handler-type route table.
//!
//! A handler type lists the update kinds it handles in [`UpdateHandler::register`]; each typed
//! `on_*` method takes exactly one payload argument. The table is built once at startup and shared by `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use dbot_core::{DbotError, Result, Update, UpdateKind};
use futures::future::BoxFuture;
use teloxide::types::{
    CallbackQuery, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery, Message,
    Poll, PollAnswer, PreCheckoutQuery, ShippingQuery, UpdateKind as TgUpdateKind,
};

/// Future returned by a registered route.
pub type HandlerFuture = BoxFuture<'static, Result<()>>;

pub(crate) type Route<H> = Arc<dyn Fn(Arc<H>, Update) -> HandlerFuture + Send + Sync>;

/// A user-supplied handler type. `register` declares which update kinds it handles; kinds it does
/// not register are never delivered to it and are left out of the allowed-update filter.
pub trait UpdateHandler: Send + Sync + Sized + 'static {
    fn register(routes: RegistryBuilder<Self>) -> RegistryBuilder<Self>;
}

/// Immutable `UpdateKind → route` table for handler type `H`.
pub struct HandlerRegistry<H> {
    routes: BTreeMap<UpdateKind, Route<H>>,
}

impl<H: UpdateHandler> HandlerRegistry<H> {
    /// Builds the table for `H` from its [`UpdateHandler::register`]. Fails if a kind is registered twice.
    pub fn build() -> Result<Self> {
        H::register(RegistryBuilder::new()).build()
    }
}

impl<H> HandlerRegistry<H> {
    /// Kinds present in the table, in declaration order of [`UpdateKind`].
    pub fn handled_kinds(&self) -> BTreeSet<UpdateKind> {
        self.routes.keys().copied().collect()
    }

    pub fn contains(&self, kind: UpdateKind) -> bool {
        self.routes.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn route(&self, kind: UpdateKind) -> Option<&Route<H>> {
        self.routes.get(&kind)
    }
}

/// Collects routes for a handler type. Duplicates are remembered and rejected by [`RegistryBuilder::build`].
pub struct RegistryBuilder<H> {
    routes: BTreeMap<UpdateKind, Route<H>>,
    duplicates: Vec<UpdateKind>,
}

impl<H: Send + Sync + 'static> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Send + Sync + 'static> RegistryBuilder<H> {
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Registers a route receiving the whole update for `kind`, for handlers that need the update id.
    pub fn on_update<F, Fut>(self, kind: UpdateKind, f: F) -> Self
    where
        F: Fn(Arc<H>, Update) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let route: Route<H> = Arc::new(move |handler: Arc<H>, update: Update| -> HandlerFuture {
            Box::pin(f(handler, update))
        });
        self.insert(kind, route)
    }

    /// Finishes the table; the first duplicated kind is reported as [`DbotError::DuplicateRoute`].
    pub fn build(self) -> Result<HandlerRegistry<H>> {
        if let Some(kind) = self.duplicates.first() {
            return Err(DbotError::DuplicateRoute(*kind));
        }
        Ok(HandlerRegistry {
            routes: self.routes,
        })
    }

    fn insert(mut self, kind: UpdateKind, route: Route<H>) -> Self {
        if self.routes.insert(kind, route).is_some() {
            self.duplicates.push(kind);
        }
        self
    }
}

/// Generates one typed `on_*` method per kind. The route unwraps the matching teloxide payload.
macro_rules! typed_routes {
    ($( $(#[$doc:meta])* $method:ident => $kind:ident($payload:ty) ),* $(,)?) => {
        impl<H: Send + Sync + 'static> RegistryBuilder<H> {
            $(
                $(#[$doc])*
                pub fn $method<F, Fut>(self, f: F) -> Self
                where
                    F: Fn(Arc<H>, $payload) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = Result<()>> + Send + 'static,
                {
                    let route: Route<H> = Arc::new(move |handler: Arc<H>, update: Update| -> HandlerFuture {
                        match update.kind {
                            TgUpdateKind::$kind(payload) => Box::pin(f(handler, payload)),
                            _ => Box::pin(async {
                                Err(DbotError::Handler(format!(
                                    "payload does not match route for {}",
                                    UpdateKind::$kind
                                )))
                            }),
                        }
                    });
                    self.insert(UpdateKind::$kind, route)
                }
            )*
        }
    };
}

typed_routes! {
    /// Handles new incoming messages.
    on_message => Message(Message),
    on_edited_message => EditedMessage(Message),
    on_channel_post => ChannelPost(Message),
    on_edited_channel_post => EditedChannelPost(Message),
    on_inline_query => InlineQuery(InlineQuery),
    on_chosen_inline_result => ChosenInlineResult(ChosenInlineResult),
    /// Handles inline keyboard button presses.
    on_callback_query => CallbackQuery(CallbackQuery),
    on_shipping_query => ShippingQuery(ShippingQuery),
    on_pre_checkout_query => PreCheckoutQuery(PreCheckoutQuery),
    on_poll => Poll(Poll),
    on_poll_answer => PollAnswer(PollAnswer),
    /// Handles changes of the bot's own membership in a chat.
    on_my_chat_member => MyChatMember(ChatMemberUpdated),
    on_chat_member => ChatMember(ChatMemberUpdated),
    on_chat_join_request => ChatJoinRequest(ChatJoinRequest),
}
