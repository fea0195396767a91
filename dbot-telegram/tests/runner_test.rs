//! Integration tests for [`dbot_telegram::run_with_api`]: each delivery mode starts, serves, and
//! tears down on shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixtures::{message_update, recording_router};
use common::mock_api::{wait_until, ApiCall, MockApi};
use dbot_telegram::{run_with_api, DeliveryMode, TelegramConfig};
use tokio::sync::oneshot;
use update_router::{
    Dispatcher, HandlerRegistry, RegistryBuilder, UpdateHandler, UpdateRouter,
};

/// Handler that registers no routes.
struct Silent;

impl UpdateHandler for Silent {
    fn register(routes: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        routes
    }
}

fn webhook_config(listen_addr: &str) -> TelegramConfig {
    let mut config = TelegramConfig::with_token("123:ABC".to_string());
    config.mode = DeliveryMode::Webhook;
    config.webhook_host = Some("https://bot.example.com".to_string());
    config.webhook_listen_addr = listen_addr.to_string();
    config
}

/// **Test: Polling mode delivers updates and stops on shutdown.**
#[tokio::test]
async fn test_polling_mode_runs_until_shutdown() {
    let api = Arc::new(MockApi::new());
    api.push_batch(Ok(vec![message_update(1, "ping")]));
    let (recorder, router) = recording_router();
    let (tx, rx) = oneshot::channel::<()>();

    let config = TelegramConfig::with_token("123:ABC".to_string());
    let task = tokio::spawn(run_with_api(config, api.clone(), router, async move {
        let _ = rx.await;
    }));

    assert!(wait_until(Duration::from_secs(2), || recorder.texts().len() == 1).await);
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("runner did not stop")
        .unwrap()
        .unwrap();

    assert!(api.set_webhook_calls().is_empty());
    assert!(!api.delete_webhook_calls().is_empty());
}

/// **Test: Webhook mode registers, serves, and deregisters exactly once on shutdown.**
#[tokio::test]
async fn test_webhook_mode_registers_and_deregisters() {
    let api = Arc::new(MockApi::new());
    let (_recorder, router) = recording_router();
    let (tx, rx) = oneshot::channel::<()>();

    let config = webhook_config("127.0.0.1:0");

    let task = tokio::spawn(run_with_api(config, api.clone(), router, async move {
        let _ = rx.await;
    }));

    assert!(wait_until(Duration::from_secs(2), || !api.set_webhook_calls().is_empty()).await);
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("runner did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(
        api.set_webhook_calls()[0].url.as_str(),
        "https://bot.example.com/bot/"
    );
    assert_eq!(api.delete_webhook_calls().len(), 1);
    assert!(matches!(api.calls().last(), Some(ApiCall::DeleteWebhook { .. })));
}

/// **Test: Invalid config fails before anything is started.**
#[tokio::test]
async fn test_invalid_config_fails_fast() {
    let api = Arc::new(MockApi::new());
    let (_recorder, router) = recording_router();

    let mut config = TelegramConfig::with_token("123:ABC".to_string());
    config.mode = DeliveryMode::Webhook;

    let result = run_with_api(config, api.clone(), router, async {}).await;

    assert!(result.is_err());
    assert!(api.calls().is_empty());
}

/// **Test: A listen address that cannot be bound fails without registering the webhook.**
///
/// **Setup:** A listener already holding a local port.
/// **Action:** run_with_api in webhook mode on that port.
/// **Expected:** error; no setWebhook, no deleteWebhook.
#[tokio::test]
async fn test_webhook_bind_failure_registers_nothing() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();
    let api = Arc::new(MockApi::new());
    let (_recorder, router) = recording_router();

    let result = run_with_api(
        webhook_config(&addr.to_string()),
        api.clone(),
        router,
        async {},
    )
    .await;

    assert!(result.is_err());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(api.set_webhook_calls().is_empty());
    assert!(api.delete_webhook_calls().is_empty());
    drop(occupied);
}

/// **Test: A handler with no routes is rejected before any remote call.**
///
/// An empty allowed-updates list would make the bot API deliver every default kind.
#[tokio::test]
async fn test_empty_registry_rejected() {
    let api = Arc::new(MockApi::new());
    let registry = Arc::new(HandlerRegistry::<Silent>::build().unwrap());
    let router: Arc<dyn UpdateRouter> = Arc::new(Dispatcher::new(Arc::new(Silent), registry));

    let polling = run_with_api(
        TelegramConfig::with_token("123:ABC".to_string()),
        api.clone(),
        Arc::clone(&router),
        async {},
    )
    .await;
    let webhook = run_with_api(webhook_config("127.0.0.1:0"), api.clone(), router, async {}).await;

    assert!(polling.is_err());
    assert!(webhook.is_err());
    assert!(api.calls().is_empty());
}
