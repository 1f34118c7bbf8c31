use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Client for sending run notifications via the Telegram Bot API.
pub struct TelegramBot {
    client: Client,
    base_url: String,
    api_key: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramBot {
    /// Creates a new `TelegramBot` with the given API key and chat ID.
    pub fn new(client: Client, api_key: String, chat_id: String) -> Self {
        Self {
            client,
            base_url: TELEGRAM_API_BASE.to_string(),
            api_key,
            chat_id,
        }
    }

    /// Points the bot at another API host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sends a text message to the configured chat.
    pub async fn push_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.api_key);
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
