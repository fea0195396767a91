//! Long-polling delivery: fetch batches from the bot API and feed them to the router in order.

use std::sync::Arc;
use std::time::Duration;

use dbot_core::{next_offset, BotApi, Result, UpdatesRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use update_router::UpdateRouter;

use crate::config::{DEFAULT_POLLING_INTERVAL_SECS, DEFAULT_POLLING_TIMEOUT_SECS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSettings {
    /// Wait after a failed iteration before retrying.
    pub cooldown: Duration,
    /// Long-poll timeout passed to `getUpdates`.
    pub timeout_secs: u32,
    /// Drop updates queued before startup (applied with the first webhook removal).
    pub drop_pending_updates: bool,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
            timeout_secs: DEFAULT_POLLING_TIMEOUT_SECS,
            drop_pending_updates: false,
        }
    }
}

enum Step {
    Continue,
    Cancelled,
}

/// Runs until `cancel` fires. Every iteration removes any webhook, long-polls one batch and
/// dispatches it sequentially. Failures are logged and retried after `settings.cooldown`.
#[instrument(skip_all)]
pub async fn run_polling(
    api: Arc<dyn BotApi>,
    router: Arc<dyn UpdateRouter>,
    settings: PollingSettings,
    cancel: CancellationToken,
) {
    match api.get_me().await {
        Ok(me) => info!(
            bot_id = me.id,
            username = ?me.username,
            "Polling started"
        ),
        Err(e) => warn!(error = %e, "Polling started, bot identity unavailable"),
    }

    let mut poller = Poller {
        api,
        router,
        settings,
        offset: None,
        pending_dropped: false,
    };

    loop {
        if cancel.is_cancelled() {
            break;
        }
        match poller.poll_once(&cancel).await {
            Ok(Step::Continue) => {}
            Ok(Step::Cancelled) => break,
            Err(e) => {
                error!(
                    error = %e,
                    cooldown_secs = poller.settings.cooldown.as_secs_f64(),
                    "Polling iteration failed, cooling down"
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poller.settings.cooldown) => {}
                }
            }
        }
    }

    info!("Polling stopped");
}

struct Poller {
    api: Arc<dyn BotApi>,
    router: Arc<dyn UpdateRouter>,
    settings: PollingSettings,
    offset: Option<i32>,
    pending_dropped: bool,
}

impl Poller {
    async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<Step> {
        let drop_pending = self.settings.drop_pending_updates && !self.pending_dropped;
        self.api.delete_webhook(drop_pending).await?;
        self.pending_dropped = true;

        let request = UpdatesRequest {
            offset: self.offset,
            timeout_secs: self.settings.timeout_secs,
            allowed_updates: self.router.handled_kinds().into_iter().collect(),
        };
        let updates = tokio::select! {
            _ = cancel.cancelled() => return Ok(Step::Cancelled),
            result = self.api.get_updates(&request) => result?,
        };

        if !updates.is_empty() {
            debug!(count = updates.len(), offset = ?self.offset, "step: batch received");
        }
        for update in updates {
            self.offset = Some(next_offset(&update));
            self.router.dispatch(update).await;
        }
        Ok(Step::Continue)
    }
}
