//! Update payloads and a recording handler shared by the integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dbot_core::{Update, UpdateKind};
use teloxide::types::Message;
use update_router::{Dispatcher, HandlerRegistry, RegistryBuilder, UpdateHandler, UpdateRouter};

pub fn message_json(update_id: u32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1700000000,
            "chat": {"id": 456, "type": "private", "first_name": "Test"},
            "from": {"id": 123, "is_bot": false, "first_name": "Test", "username": "test_user"},
            "text": text
        }
    })
}

/// Parses from text: teloxide's `Update` does not deserialize through `serde_json::Value`.
pub fn parse_update(value: serde_json::Value) -> Update {
    serde_json::from_str(&value.to_string()).unwrap()
}

pub fn message_update(update_id: u32, text: &str) -> Update {
    parse_update(message_json(update_id, text))
}

pub fn callback_update(update_id: u32) -> Update {
    parse_update(serde_json::json!({
        "update_id": update_id,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": 123, "is_bot": false, "first_name": "Test"},
            "chat_instance": "ci-1",
            "data": "press"
        }
    }))
}

/// Handles messages only; records their text in arrival order.
#[derive(Default)]
pub struct Recorder {
    texts: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    async fn on_message(&self, msg: Message) -> dbot_core::Result<()> {
        self.texts
            .lock()
            .unwrap()
            .push(msg.text().unwrap_or_default().to_string());
        Ok(())
    }
}

impl UpdateHandler for Recorder {
    fn register(routes: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        routes.on_message(|h, msg| async move { h.on_message(msg).await })
    }
}

/// A Recorder and the router bound to it.
pub fn recording_router() -> (Arc<Recorder>, Arc<dyn UpdateRouter>) {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(HandlerRegistry::<Recorder>::build().unwrap());
    let dispatcher = Dispatcher::new(Arc::clone(&recorder), registry)
        .with_transport_backoff(Duration::from_millis(1));
    (recorder, Arc::new(dispatcher))
}

pub const HANDLED: [UpdateKind; 1] = [UpdateKind::Message];
