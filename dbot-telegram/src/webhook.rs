//! Webhook lifecycle: keep the registered webhook pointed at this process and remove it on stop.
//!
//! [`WebhookCoordinator`] is Stopped until [`WebhookCoordinator::start`] spawns the refresh loop and
//! Running until [`WebhookCoordinator::stop`] cancels it and deregisters. Calling either out of
//! order is a [`LifecycleError`].

use std::sync::Arc;

use dbot_core::{BotApi, LifecycleError, Result, Update, WebhookRegistration};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use update_router::{RouteOutcome, UpdateRouter};

use crate::config::WebhookSettings;

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct WebhookCoordinator {
    api: Arc<dyn BotApi>,
    router: Arc<dyn UpdateRouter>,
    settings: Arc<WebhookSettings>,
    running: Mutex<Option<RefreshTask>>,
}

impl WebhookCoordinator {
    pub fn new(
        api: Arc<dyn BotApi>,
        router: Arc<dyn UpdateRouter>,
        settings: Arc<WebhookSettings>,
    ) -> Self {
        Self {
            api,
            router,
            settings,
            running: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Arc<WebhookSettings> {
        &self.settings
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Spawns the refresh loop. Fails with [`LifecycleError::AlreadyRunning`] if it is already running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(LifecycleError::AlreadyRunning.into());
        }

        let registration = WebhookRegistration {
            url: self.settings.webhook_url()?,
            allowed_updates: self.router.handled_kinds().into_iter().collect(),
            secret_token: self.settings.secret.clone(),
            drop_pending_updates: self.settings.drop_pending_updates,
        };
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(
            Arc::clone(&self.api),
            registration,
            self.settings.refresh_interval,
            cancel.clone(),
        ));
        *running = Some(RefreshTask { cancel, handle });
        info!("Webhook refresh loop started");
        Ok(())
    }

    /// Cancels the refresh loop, waits for it to exit, then deregisters the webhook once.
    /// Fails with [`LifecycleError::NotRunning`] if it is not running. The coordinator is Stopped
    /// afterwards even if deregistration fails.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        let Some(task) = running.take() else {
            return Err(LifecycleError::NotRunning.into());
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Webhook refresh loop ended abnormally");
        }

        match self.api.delete_webhook(self.settings.drop_pending_updates).await {
            Ok(()) => {
                info!("Webhook removed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to remove webhook");
                Err(e)
            }
        }
    }

    /// Entry point for updates received by the webhook endpoint. Handler failures are reported by
    /// the router and never surface here.
    pub async fn handle_inbound_update(&self, update: Update) -> RouteOutcome {
        self.router.dispatch(update).await
    }
}

/// Registers, logs, sleeps; repeats until cancelled. Failures are retried on the next cycle.
async fn refresh_loop(
    api: Arc<dyn BotApi>,
    registration: WebhookRegistration,
    interval: std::time::Duration,
    cancel: CancellationToken,
) {
    loop {
        match api.set_webhook(&registration).await {
            Ok(()) => info!(
                url = %registration.url,
                allowed_updates = ?registration.allowed_updates,
                "Webhook registered"
            ),
            Err(e) => warn!(
                url = %registration.url,
                error = %e,
                "Webhook registration failed, retrying next cycle"
            ),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
