//! Routes updates to the handler's registered routes and contains handler failures.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbot_core::{DbotError, Update, UpdateKind};
use futures::FutureExt;
use tracing::{debug, error, instrument, warn};

use crate::registry::HandlerRegistry;

/// Suspend applied after a handler fails with a transport error, before the next update is taken.
pub const DEFAULT_TRANSPORT_BACKOFF: Duration = Duration::from_secs(2);

/// What happened to one routed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The registered route ran to completion.
    Handled(UpdateKind),
    /// No route for this kind (`None`: kind outside [`UpdateKind`]); nothing was invoked.
    Unhandled(Option<UpdateKind>),
    /// The route returned an error or panicked; it was reported and swallowed.
    Failed(UpdateKind),
}

/// Type-erased dispatch seam used by the polling loop, the webhook coordinator and the HTTP routes.
#[async_trait]
pub trait UpdateRouter: Send + Sync {
    /// Routes one update. Never fails: handler errors are reported here and not propagated.
    async fn dispatch(&self, update: Update) -> RouteOutcome;
    /// Kinds with a registered route; used as the allowed-update filter.
    fn handled_kinds(&self) -> BTreeSet<UpdateKind>;
}

/// Binds one handler instance to its type's registry.
pub struct Dispatcher<H> {
    handler: Arc<H>,
    registry: Arc<HandlerRegistry<H>>,
    transport_backoff: Duration,
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            registry: Arc::clone(&self.registry),
            transport_backoff: self.transport_backoff,
        }
    }
}

impl<H: Send + Sync + 'static> Dispatcher<H> {
    pub fn new(handler: Arc<H>, registry: Arc<HandlerRegistry<H>>) -> Self {
        Self {
            handler,
            registry,
            transport_backoff: DEFAULT_TRANSPORT_BACKOFF,
        }
    }

    /// Overrides the suspend applied after a handler transport error.
    pub fn with_transport_backoff(mut self, backoff: Duration) -> Self {
        self.transport_backoff = backoff;
        self
    }

    pub fn handled_kinds(&self) -> BTreeSet<UpdateKind> {
        self.registry.handled_kinds()
    }

    /// Looks up the route for the update's kind and awaits it. Unhandled kinds log a warning.
    #[instrument(skip(self, update), fields(update_id = update.id.0))]
    pub async fn route(&self, update: Update) -> RouteOutcome {
        let Some(kind) = UpdateKind::of(&update) else {
            warn!("step: update kind not supported, skipped");
            return RouteOutcome::Unhandled(None);
        };
        let Some(route) = self.registry.route(kind) else {
            warn!(kind = %kind, "step: no handler registered for update kind, skipped");
            return RouteOutcome::Unhandled(Some(kind));
        };

        debug!(kind = %kind, "step: routing update");
        let result = AssertUnwindSafe((**route)(Arc::clone(&self.handler), update))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DbotError::Handler(panic_message(panic))));

        match result {
            Ok(()) => {
                debug!(kind = %kind, "step: update handled");
                RouteOutcome::Handled(kind)
            }
            Err(e) => {
                report_handler_error(kind, &e, self.transport_backoff).await;
                RouteOutcome::Failed(kind)
            }
        }
    }
}

#[async_trait]
impl<H: Send + Sync + 'static> UpdateRouter for Dispatcher<H> {
    async fn dispatch(&self, update: Update) -> RouteOutcome {
        self.route(update).await
    }

    fn handled_kinds(&self) -> BTreeSet<UpdateKind> {
        Dispatcher::handled_kinds(self)
    }
}

/// Logs a handler failure. Remote API errors are logged with their code; transport errors also
/// suspend for `transport_backoff` so a failing connection is not hammered by the next update.
pub async fn report_handler_error(kind: UpdateKind, error: &DbotError, transport_backoff: Duration) {
    match error {
        DbotError::Api { code, description } => {
            error!(kind = %kind, code = ?code, description = %description, "Bot API error while handling update");
        }
        e if e.is_transport() => {
            warn!(
                kind = %kind,
                error = %e,
                backoff_ms = transport_backoff.as_millis() as u64,
                "Transport error while handling update, backing off"
            );
            tokio::time::sleep(transport_backoff).await;
        }
        e => {
            error!(kind = %kind, error = %e, "Handler failed");
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
