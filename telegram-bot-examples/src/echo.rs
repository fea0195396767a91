//! Echo bot: replies to text messages and acknowledges button presses. Runs in polling or webhook
//! mode; config from env (see `dbot_telegram::TelegramConfig::from_env`), CLI flags override.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbot_core::TelegramBot;
use dbot_telegram::{run_bot, DeliveryMode, TelegramConfig};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message};
use tracing::{info, instrument};
use update_router::{RegistryBuilder, UpdateHandler};

#[derive(Parser)]
#[command(name = "echo-bot")]
#[command(about = "Telegram echo bot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (config from env; flags override BOT_TOKEN and BOT_MODE).
    Run {
        #[arg(short, long)]
        token: Option<String>,
        #[arg(short, long)]
        mode: Option<DeliveryMode>,
    },
}

struct EchoHandler {
    bot: teloxide::Bot,
}

impl EchoHandler {
    #[instrument(skip(self, msg), fields(chat_id = msg.chat.id.0))]
    async fn on_message(&self, msg: Message) -> dbot_core::Result<()> {
        let Some(text) = msg.text() else {
            return Ok(());
        };
        info!(message_content = %text, "Echoing message");
        self.bot
            .send_message(msg.chat.id, format!("Echo: {}", text))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, query), fields(user_id = query.from.id.0))]
    async fn on_callback_query(&self, query: CallbackQuery) -> dbot_core::Result<()> {
        let data = query.data.clone().unwrap_or_default();
        info!(data = %data, "Answering callback query");
        self.bot
            .answer_callback_query(query.id)
            .text(format!("Pressed: {}", data))
            .await?;
        Ok(())
    }
}

impl UpdateHandler for EchoHandler {
    fn register(routes: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        routes
            .on_message(|h, msg| async move { h.on_message(msg).await })
            .on_callback_query(|h, query| async move { h.on_callback_query(query).await })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token, mode } => {
            let mut config = TelegramConfig::from_env(token)?;
            if let Some(mode) = mode {
                config.mode = mode;
            }

            let client = match config.telegram_api_url.as_deref() {
                Some(url) => TelegramBot::with_api_url(config.bot_token.clone(), url)?,
                None => TelegramBot::new(config.bot_token.clone()),
            };
            let handler = Arc::new(EchoHandler {
                bot: client.inner().clone(),
            });
            run_bot(config, handler).await
        }
    }
}
