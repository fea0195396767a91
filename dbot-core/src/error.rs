use teloxide::RequestError;
use thiserror::Error;

use crate::types::UpdateKind;

#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Error reported by the remote bot API. `code` mirrors the API error code when one is known.
    #[error("Bot API error{}: {description}", api_code_suffix(.code))]
    Api {
        code: Option<u16>,
        description: String,
    },

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Duplicate route for update kind {0}")]
    DuplicateRoute(UpdateKind),

    #[error("Unknown update kind: {0}")]
    UnknownUpdateKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Misuse of the webhook coordinator's Start/Stop pair.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("webhook refresh loop is already running")]
    AlreadyRunning,

    #[error("webhook refresh loop is not running")]
    NotRunning,
}

fn api_code_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(" ({})", c)).unwrap_or_default()
}

impl DbotError {
    /// True for failures reaching the remote API (network, IO); these are retried, never fatal.
    pub fn is_transport(&self) -> bool {
        matches!(self, DbotError::Transport(_) | DbotError::Io(_))
    }
}

impl From<RequestError> for DbotError {
    fn from(e: RequestError) -> Self {
        match &e {
            RequestError::Api(api) => DbotError::Api {
                code: None,
                description: api.to_string(),
            },
            RequestError::RetryAfter(_) => DbotError::Api {
                code: Some(429),
                description: e.to_string(),
            },
            RequestError::MigrateToChatId(_) => DbotError::Api {
                code: Some(400),
                description: e.to_string(),
            },
            RequestError::Network(_) | RequestError::Io(_) => DbotError::Transport(e.to_string()),
            _ => DbotError::Bot(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbotError>;
