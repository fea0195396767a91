//! Recording implementation of [`dbot_core::BotApi`] for integration tests.
//!
//! Every call is recorded with the instant it was made. `get_updates` replays scripted batches and
//! then blocks like an idle long poll, so tests drive the loops without reaching Telegram.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dbot_core::{
    BotApi, BotIdentity, DbotError, Result, Update, UpdatesRequest, WebhookRegistration,
    WebhookStatus,
};
use reqwest::Url;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetMe,
    SetWebhook(WebhookRegistration),
    DeleteWebhook { drop_pending_updates: bool },
    GetWebhookInfo,
    GetUpdates(UpdatesRequest),
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<(Instant, ApiCall)>>,
    batches: Mutex<VecDeque<Result<Vec<Update>>>>,
    registered_url: Mutex<Option<Url>>,
    fail_get_me: AtomicBool,
    fail_set_webhook: AtomicBool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of the next `get_updates` call.
    pub fn push_batch(&self, batch: Result<Vec<Update>>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn fail_get_me(&self) {
        self.fail_get_me.store(true, Ordering::SeqCst);
    }

    pub fn fail_set_webhook(&self) {
        self.fail_set_webhook.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, ApiCall)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_webhook_calls(&self) -> Vec<WebhookRegistration> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::SetWebhook(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn delete_webhook_calls(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::DeleteWebhook {
                    drop_pending_updates,
                } => Some(drop_pending_updates),
                _ => None,
            })
            .collect()
    }

    pub fn get_updates_calls(&self) -> Vec<UpdatesRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::GetUpdates(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl BotApi for MockApi {
    async fn get_me(&self) -> Result<BotIdentity> {
        self.record(ApiCall::GetMe);
        if self.fail_get_me.load(Ordering::SeqCst) {
            return Err(DbotError::Transport("connection refused".to_string()));
        }
        Ok(BotIdentity {
            id: 123456789,
            username: Some("testbot".to_string()),
            first_name: "TestBot".to_string(),
        })
    }

    async fn set_webhook(&self, registration: &WebhookRegistration) -> Result<()> {
        self.record(ApiCall::SetWebhook(registration.clone()));
        if self.fail_set_webhook.load(Ordering::SeqCst) {
            return Err(DbotError::Api {
                code: Some(400),
                description: "Bad Request: bad webhook".to_string(),
            });
        }
        *self.registered_url.lock().unwrap() = Some(registration.url.clone());
        Ok(())
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        self.record(ApiCall::DeleteWebhook {
            drop_pending_updates,
        });
        *self.registered_url.lock().unwrap() = None;
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookStatus> {
        self.record(ApiCall::GetWebhookInfo);
        Ok(WebhookStatus {
            url: self.registered_url.lock().unwrap().clone(),
            ..WebhookStatus::default()
        })
    }

    async fn get_updates(&self, request: &UpdatesRequest) -> Result<Vec<Update>> {
        self.record(ApiCall::GetUpdates(request.clone()));
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Idle long poll: nothing queued, wait to be cancelled.
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
