//! Runner: validates config, builds the dispatcher and the client, then runs the configured delivery mode
//! until shutdown. Polling runs the long-poll loop; webhook starts the coordinator and serves the routes.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use dbot_core::{init_tracing, BotApi, DbotError, TelegramBot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use update_router::{Dispatcher, HandlerRegistry, UpdateHandler, UpdateRouter};

use crate::config::{DeliveryMode, TelegramConfig};
use crate::polling::run_polling;
use crate::routes::{build_router, WebhookState};
use crate::webhook::WebhookCoordinator;

/// Main entry: validate config, init logging, build the registry for `H`, then run until Ctrl-C.
#[instrument(skip_all, fields(mode = %config.mode))]
pub async fn run_bot<H: UpdateHandler>(config: TelegramConfig, handler: Arc<H>) -> Result<()> {
    config.validate()?;
    init_tracing(config.log_file.as_deref())?;

    let registry = Arc::new(HandlerRegistry::<H>::build()?);
    info!(handled_kinds = ?registry.handled_kinds(), "Handler registry built");
    let router: Arc<dyn UpdateRouter> = Arc::new(Dispatcher::new(handler, registry));

    let api: Arc<dyn BotApi> = match config.telegram_api_url.as_deref() {
        Some(url) => Arc::new(TelegramBot::with_api_url(config.bot_token.clone(), url)?),
        None => Arc::new(TelegramBot::new(config.bot_token.clone())),
    };

    run_with_api(config, api, router, shutdown_signal()).await
}

/// Runs the configured delivery mode with injected collaborators until `shutdown` resolves.
pub async fn run_with_api<S>(
    config: TelegramConfig,
    api: Arc<dyn BotApi>,
    router: Arc<dyn UpdateRouter>,
    shutdown: S,
) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    if router.handled_kinds().is_empty() {
        // An empty allowed-updates list means "all default kinds" to the bot API.
        return Err(DbotError::Config("handler registers no update kinds".to_string()).into());
    }

    match config.mode {
        DeliveryMode::Polling => {
            let cancel = CancellationToken::new();
            let task = tokio::spawn(run_polling(
                api,
                router,
                config.polling_settings(),
                cancel.clone(),
            ));
            info!("Bot started (polling)");

            shutdown.await;
            info!("Shutdown requested, stopping polling");
            cancel.cancel();
            task.await.context("Polling task failed")?;
        }
        DeliveryMode::Webhook => {
            let settings = Arc::new(config.webhook_settings()?);
            let addr = config.listen_addr()?;
            let webhook_url = settings.webhook_url()?;

            // Bound before registration: the registered url must never point at a closed port.
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind webhook listener on {}", addr))?;

            let coordinator = Arc::new(WebhookCoordinator::new(
                Arc::clone(&api),
                router,
                Arc::clone(&settings),
            ));
            coordinator.start().await?;

            let app = build_router(WebhookState {
                coordinator: Arc::clone(&coordinator),
                api,
            });
            info!(
                listen_addr = %addr,
                webhook_url = %webhook_url,
                "Bot started (webhook)"
            );

            let served = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await;
            if let Err(ref e) = served {
                error!(error = %e, "Webhook server failed");
            }

            info!("Shutdown requested, removing webhook");
            if coordinator.is_running().await {
                if let Err(e) = coordinator.stop().await {
                    warn!(error = %e, "Webhook teardown failed");
                }
            }
            served.context("Webhook server failed")?;
        }
    }

    info!("Bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
}
