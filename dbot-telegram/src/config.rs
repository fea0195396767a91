//! Delivery-layer config: token, API URL, log file, delivery mode, webhook and polling knobs.
//! Loaded from env: BOT_TOKEN, TELEGRAM_API_URL (or TELOXIDE_API_URL), LOG_FILE, BOT_MODE, WEBHOOK_*,
//! POLLING_*, DROP_PENDING_UPDATES. Errors surface as [`DbotError::Config`] before any task starts.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use dbot_core::{parse_api_url, DbotError, Result};
use reqwest::Url;

use crate::polling::PollingSettings;

pub const DEFAULT_WEBHOOK_ROUTE: &str = "/bot";
pub const DEFAULT_WEBHOOK_REFRESH_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_WEBHOOK_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLLING_TIMEOUT_SECS: u32 = 10;

/// How updates reach the process. The two modes are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Polling,
    Webhook,
}

impl FromStr for DeliveryMode {
    type Err = DbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" => Ok(DeliveryMode::Polling),
            "webhook" => Ok(DeliveryMode::Webhook),
            other => Err(DbotError::Config(format!(
                "BOT_MODE must be `polling` or `webhook`, got `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::Polling => f.write_str("polling"),
            DeliveryMode::Webhook => f.write_str("webhook"),
        }
    }
}

/// Delivery-layer config (connectivity, logging, polling and webhook knobs).
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
    pub log_file: Option<String>,
    pub mode: DeliveryMode,
    /// Public base URL the bot API calls back, e.g. `https://bot.example.com`. Required in webhook mode.
    pub webhook_host: Option<String>,
    /// Route template; `{token}` is replaced by the bot token.
    pub webhook_route: String,
    pub webhook_secret: Option<String>,
    pub webhook_refresh_interval_secs: u64,
    pub webhook_listen_addr: String,
    /// Cooldown after a failed polling iteration.
    pub polling_interval_secs: u64,
    pub polling_timeout_secs: u32,
    pub drop_pending_updates: bool,
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DbotError::Config(format!("{} is not a valid value: {}", name, raw))),
        None => Ok(default),
    }
}

fn env_flag(name: &str) -> Result<bool> {
    match env_opt(name).as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(DbotError::Config(format!("{} is not a boolean: {}", name, v))),
    }
}

impl TelegramConfig {
    /// Loads from env. `token` overrides BOT_TOKEN; one of them is required.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let bot_token = match token.or_else(|| env_opt("BOT_TOKEN")) {
            Some(t) => t,
            None => return Err(DbotError::Config("BOT_TOKEN not set".to_string())),
        };
        let mode = match env_opt("BOT_MODE") {
            Some(raw) => raw.parse()?,
            None => DeliveryMode::default(),
        };

        Ok(Self {
            bot_token,
            telegram_api_url: env_opt("TELEGRAM_API_URL").or_else(|| env_opt("TELOXIDE_API_URL")),
            log_file: env_opt("LOG_FILE"),
            mode,
            webhook_host: env_opt("WEBHOOK_HOST"),
            webhook_route: env_opt("WEBHOOK_ROUTE")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_ROUTE.to_string()),
            webhook_secret: env_opt("WEBHOOK_SECRET"),
            webhook_refresh_interval_secs: env_parse(
                "WEBHOOK_REFRESH_INTERVAL_SECS",
                DEFAULT_WEBHOOK_REFRESH_INTERVAL_SECS,
            )?,
            webhook_listen_addr: env_opt("WEBHOOK_LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_LISTEN_ADDR.to_string()),
            polling_interval_secs: env_parse(
                "POLLING_INTERVAL_SECS",
                DEFAULT_POLLING_INTERVAL_SECS,
            )?,
            polling_timeout_secs: env_parse("POLLING_TIMEOUT_SECS", DEFAULT_POLLING_TIMEOUT_SECS)?,
            drop_pending_updates: env_flag("DROP_PENDING_UPDATES")?,
        })
    }

    /// Builds polling-mode config with the given token; everything else at defaults.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            log_file: None,
            mode: DeliveryMode::Polling,
            webhook_host: None,
            webhook_route: DEFAULT_WEBHOOK_ROUTE.to_string(),
            webhook_secret: None,
            webhook_refresh_interval_secs: DEFAULT_WEBHOOK_REFRESH_INTERVAL_SECS,
            webhook_listen_addr: DEFAULT_WEBHOOK_LISTEN_ADDR.to_string(),
            polling_interval_secs: DEFAULT_POLLING_INTERVAL_SECS,
            polling_timeout_secs: DEFAULT_POLLING_TIMEOUT_SECS,
            drop_pending_updates: false,
        }
    }

    /// Fails fast on caller mistakes: empty token, bad API URL, and in webhook mode a missing or
    /// malformed host, route template, secret, refresh interval or listen address.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(DbotError::Config("BOT_TOKEN is empty".to_string()));
        }
        if let Some(ref url) = self.telegram_api_url {
            parse_api_url(url)?;
        }
        if self.mode == DeliveryMode::Webhook {
            self.webhook_settings()?;
            self.listen_addr()?;
        }
        Ok(())
    }

    /// Webhook settings derived from this config; fails if the host is missing or anything is malformed.
    pub fn webhook_settings(&self) -> Result<WebhookSettings> {
        let host = self.webhook_host.as_deref().ok_or_else(|| {
            DbotError::Config("WEBHOOK_HOST is required in webhook mode".to_string())
        })?;
        if self.webhook_refresh_interval_secs == 0 {
            return Err(DbotError::Config(
                "WEBHOOK_REFRESH_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let mut settings = WebhookSettings::new(&self.bot_token, host, &self.webhook_route)?
            .with_refresh_interval(Duration::from_secs(self.webhook_refresh_interval_secs))
            .with_drop_pending_updates(self.drop_pending_updates);
        if let Some(ref secret) = self.webhook_secret {
            settings = settings.with_secret(secret)?;
        }
        Ok(settings)
    }

    pub fn polling_settings(&self) -> PollingSettings {
        PollingSettings {
            cooldown: Duration::from_secs(self.polling_interval_secs),
            timeout_secs: self.polling_timeout_secs,
            drop_pending_updates: self.drop_pending_updates,
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.webhook_listen_addr.parse().map_err(|_| {
            DbotError::Config(format!(
                "WEBHOOK_LISTEN_ADDR is not a socket address: {}",
                self.webhook_listen_addr
            ))
        })
    }
}

/// Everything the webhook side needs: registration target, refresh cadence and the shared secret.
/// Built once from config and shared read-only by the coordinator, the routes and the health probe.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub token: String,
    pub host: Url,
    pub route: String,
    pub refresh_interval: Duration,
    pub drop_pending_updates: bool,
    pub secret: Option<String>,
}

impl WebhookSettings {
    pub fn new(token: &str, host: &str, route: &str) -> Result<Self> {
        let host = Url::parse(host)
            .map_err(|e| DbotError::Config(format!("WEBHOOK_HOST is not a valid URL ({}): {}", e, host)))?;
        if host.scheme() != "https" {
            return Err(DbotError::Config(format!(
                "WEBHOOK_HOST must use https, got {}",
                host
            )));
        }
        validate_route_template(route)?;
        Ok(Self {
            token: token.to_string(),
            host,
            route: route.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_WEBHOOK_REFRESH_INTERVAL_SECS),
            drop_pending_updates: false,
            secret: None,
        })
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_drop_pending_updates(mut self, drop_pending_updates: bool) -> Self {
        self.drop_pending_updates = drop_pending_updates;
        self
    }

    /// Sets the secret the bot API echoes in `X-Telegram-Bot-Api-Secret-Token`.
    /// Allowed: 1-256 characters of `A-Z`, `a-z`, `0-9`, `_` and `-`.
    pub fn with_secret(mut self, secret: &str) -> Result<Self> {
        let valid = !secret.is_empty()
            && secret.len() <= 256
            && secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DbotError::Config(
                "WEBHOOK_SECRET must be 1-256 characters of A-Z, a-z, 0-9, _ and -".to_string(),
            ));
        }
        self.secret = Some(secret.to_string());
        Ok(self)
    }

    /// Route with `{token}` substituted, a leading `/` and no trailing `/` (empty for the root).
    pub fn route_path(&self) -> String {
        let route = self.route.replace("{token}", &self.token);
        let trimmed = route.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Public URL registered with the bot API: host + route + `/`.
    pub fn webhook_url(&self) -> Result<Url> {
        let url = format!(
            "{}{}/",
            self.host.as_str().trim_end_matches('/'),
            self.route_path()
        );
        Url::parse(&url)
            .map_err(|e| DbotError::Config(format!("Invalid webhook url {}: {}", url, e)))
    }

    /// True if a request carrying `header` (the secret-token header value) may be dispatched.
    pub fn authorize(&self, header: Option<&str>) -> bool {
        match &self.secret {
            Some(secret) => header == Some(secret.as_str()),
            None => true,
        }
    }
}

fn validate_route_template(route: &str) -> Result<()> {
    let malformed = |why: &str| {
        Err(DbotError::Config(format!(
            "WEBHOOK_ROUTE `{}` is malformed: {}",
            route, why
        )))
    };
    if route.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return malformed("whitespace, `?` and `#` are not allowed");
    }
    let without_placeholder = route.replace("{token}", "");
    if without_placeholder.contains('{') || without_placeholder.contains('}') {
        return malformed("only the `{token}` placeholder is supported");
    }
    if route.split('/').any(|segment| segment.starts_with(':') || segment.starts_with('*')) {
        return malformed("path captures are not supported");
    }
    Ok(())
}
