use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::DeliveryError;

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts one formatted message.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramGateway {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

impl TelegramGateway {
    pub fn new(token: String, chat_id: String) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            token,
            chat_id,
        })
    }

    /// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHANNEL_ID`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN must be set (or pass --dry-run)")?;
        let chat_id = std::env::var("TELEGRAM_CHANNEL_ID")
            .context("TELEGRAM_CHANNEL_ID must be set (or pass --dry-run)")?;
        Self::new(token, chat_id)
    }
}

#[async_trait]
impl DeliveryGateway for TelegramGateway {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", API_BASE, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(chars = text.chars().count(), "sent to Telegram");
        Ok(())
    }
}

/// Dry-run gateway: prints messages instead of posting them.
pub struct ConsoleGateway;

#[async_trait]
impl DeliveryGateway for ConsoleGateway {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        println!("{}\n", text);
        Ok(())
    }
}
