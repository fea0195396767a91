//! Health probe: bot identity, and in webhook mode whether the remote webhook still points here.

use dbot_core::BotApi;
use serde::Serialize;
use tracing::debug;

use crate::config::WebhookSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub detail: String,
}

impl HealthReport {
    fn new(status: HealthStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Unhealthy if `getMe` fails. With `webhook` set, Degraded when the registered URL differs from
/// the configured one or cannot be read.
pub async fn probe(api: &dyn BotApi, webhook: Option<&WebhookSettings>) -> HealthReport {
    let me = match api.get_me().await {
        Ok(me) => me,
        Err(e) => return HealthReport::new(HealthStatus::Unhealthy, format!("getMe failed: {}", e)),
    };
    let name = me
        .username
        .map(|u| format!("@{}", u))
        .unwrap_or(me.first_name);

    let Some(settings) = webhook else {
        return HealthReport::new(HealthStatus::Healthy, format!("{} is reachable", name));
    };

    let expected = match settings.webhook_url() {
        Ok(url) => url,
        Err(e) => return HealthReport::new(HealthStatus::Degraded, e.to_string()),
    };
    match api.get_webhook_info().await {
        Ok(info) if info.url.as_ref() == Some(&expected) => {
            debug!(pending = info.pending_update_count, "Webhook matches configuration");
            HealthReport::new(
                HealthStatus::Healthy,
                format!("{} is reachable, webhook registered", name),
            )
        }
        Ok(info) => HealthReport::new(
            HealthStatus::Degraded,
            format!(
                "webhook mismatch: registered {}, expected {}",
                info.url
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<none>".to_string()),
                expected
            ),
        ),
        Err(e) => HealthReport::new(
            HealthStatus::Degraded,
            format!("getWebhookInfo failed: {}", e),
        ),
    }
}
